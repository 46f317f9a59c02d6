//! Exact spellings of common non-SPDX license names.
//!
//! Keys are lowercase. Lookups are exact after lowercasing and trimming;
//! nothing here is a pattern.

pub(super) const LICENSE_ALIASES: &[(&str, &str)] = &[
    // Prose names used by language registries
    ("mit license", "MIT"),
    ("the mit license", "MIT"),
    ("the mit license (mit)", "MIT"),
    ("apache license 2.0", "Apache-2.0"),
    ("apache license, version 2.0", "Apache-2.0"),
    ("apache license version 2.0", "Apache-2.0"),
    ("apache 2.0", "Apache-2.0"),
    ("apache 2", "Apache-2.0"),
    ("apache-2", "Apache-2.0"),
    ("apache software license", "Apache-2.0"),
    ("bsd 3-clause", "BSD-3-Clause"),
    ("3-clause bsd", "BSD-3-Clause"),
    ("new bsd", "BSD-3-Clause"),
    ("new bsd license", "BSD-3-Clause"),
    ("bsd 2-clause", "BSD-2-Clause"),
    ("2-clause bsd", "BSD-2-Clause"),
    ("simplified bsd", "BSD-2-Clause"),
    ("simplified bsd license", "BSD-2-Clause"),
    ("isc license", "ISC"),
    ("gpl v2", "GPL-2.0-only"),
    ("gnu gpl v2", "GPL-2.0-only"),
    ("gpl v3", "GPL-3.0-only"),
    ("gnu gpl v3", "GPL-3.0-only"),
    ("lgpl v2.1", "LGPL-2.1-only"),
    ("gnu lgpl v2.1", "LGPL-2.1-only"),
    ("lgpl v3", "LGPL-3.0-only"),
    ("gnu lgpl v3", "LGPL-3.0-only"),
    ("mpl 2.0", "MPL-2.0"),
    ("mozilla public license 2.0", "MPL-2.0"),
    ("cc0 1.0", "CC0-1.0"),
    ("public domain", "CC0-1.0"),
    ("public-domain", "CC0-1.0"),
    ("psf", "Python-2.0"),
    ("psf-2", "Python-2.0"),
    ("psfl", "Python-2.0"),
    ("python software foundation license", "Python-2.0"),
    // RPM spec file short names
    ("gplv2", "GPL-2.0-only"),
    ("gplv2+", "GPL-2.0-or-later"),
    ("gplv3", "GPL-3.0-only"),
    ("gplv3+", "GPL-3.0-or-later"),
    ("gpl+", "GPL-1.0-or-later"),
    ("lgplv2", "LGPL-2.0-only"),
    ("lgplv2.1", "LGPL-2.1-only"),
    ("lgplv2.1+", "LGPL-2.1-or-later"),
    ("lgplv3", "LGPL-3.0-only"),
    ("lgplv3+", "LGPL-3.0-or-later"),
    ("agplv3", "AGPL-3.0-only"),
    ("agplv3+", "AGPL-3.0-or-later"),
    ("bsd with advertising", "BSD-4-Clause"),
    ("asl 2.0", "Apache-2.0"),
    ("asl 1.1", "Apache-1.1"),
    ("mplv1.0", "MPL-1.0"),
    ("mplv1.1", "MPL-1.1"),
    ("mplv2.0", "MPL-2.0"),
    ("artistic 2.0", "Artistic-2.0"),
    ("cc0", "CC0-1.0"),
    ("boost", "BSL-1.0"),
    ("epl 2.0", "EPL-2.0"),
    ("bitstream vera", "Bitstream-Vera"),
    // DEP-5 copyright file short names
    ("gpl-1", "GPL-1.0-only"),
    ("gpl-1+", "GPL-1.0-or-later"),
    ("gpl-2", "GPL-2.0-only"),
    ("gpl-2+", "GPL-2.0-or-later"),
    ("gpl-2.0", "GPL-2.0-only"),
    ("gpl-2.0+", "GPL-2.0-or-later"),
    ("gpl-3", "GPL-3.0-only"),
    ("gpl-3+", "GPL-3.0-or-later"),
    ("gpl-3.0", "GPL-3.0-only"),
    ("gpl-3.0+", "GPL-3.0-or-later"),
    ("lgpl-2", "LGPL-2.0-only"),
    ("lgpl-2+", "LGPL-2.0-or-later"),
    ("lgpl-2.0+", "LGPL-2.0-or-later"),
    ("lgpl-2.1", "LGPL-2.1-only"),
    ("lgpl-2.1+", "LGPL-2.1-or-later"),
    ("lgpl-3", "LGPL-3.0-only"),
    ("lgpl-3+", "LGPL-3.0-or-later"),
    ("lgpl-3.0+", "LGPL-3.0-or-later"),
    ("agpl-3", "AGPL-3.0-only"),
    ("agpl-3+", "AGPL-3.0-or-later"),
    ("agpl-3.0", "AGPL-3.0-only"),
    ("agpl-3.0+", "AGPL-3.0-or-later"),
    ("expat", "MIT"),
    ("zlib/libpng", "Zlib"),
    ("boost-1.0", "BSL-1.0"),
];

/// Look up an exact alias, case-insensitively.
pub(super) fn lookup(raw: &str) -> Option<&'static str> {
    let key = raw.trim().to_lowercase();
    LICENSE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, id)| *id)
}
