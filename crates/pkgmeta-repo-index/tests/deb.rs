mod common;

use common::{FakeFetch, gzip};
use pkgmeta_repo_index::deb::{AptArchive, AptLayout};

const BASE: &str = "https://mirror.test/ubuntu";

const MAIN: &str = "\
Package: bash
Architecture: amd64
Version: 5.1-6ubuntu1
Maintainer: Ubuntu Developers <ubuntu-devel-discuss@lists.ubuntu.com>
Description: GNU Bourne Again SHell
Filename: pool/main/b/bash/bash_5.1-6ubuntu1_amd64.deb
";

const UNIVERSE: &str = "\
Package: redis-server
Architecture: amd64
Version: 5:6.0.16-1ubuntu1
Maintainer: Ubuntu Developers <ubuntu-devel-discuss@lists.ubuntu.com>
Homepage: https://redis.io/
Description: Persistent key-value database with network interface
 Redis is a key-value database in a similar vein to memcache.
Filename: pool/universe/r/redis/redis-server_6.0.16-1ubuntu1_amd64.deb
";

fn url(suite: &str, component: &str) -> String {
    format!("{BASE}/dists/{suite}/{component}/binary-amd64/Packages.gz")
}

fn archive(fetch: &FakeFetch) -> AptArchive<&FakeFetch> {
    AptArchive::new(AptLayout::ubuntu().with_base_url(BASE), fetch)
}

#[test]
fn universe_package_loads_main_first() {
    let fetch = FakeFetch::new()
        .with(&url("jammy", "main"), gzip(MAIN))
        .with(&url("jammy", "universe"), gzip(UNIVERSE));
    let archive = archive(&fetch);

    let hit = archive.find("redis-server", "jammy", "amd64").unwrap();
    assert_eq!(hit.record.version, "5:6.0.16-1ubuntu1");
    assert_eq!(hit.coordinate.component, "universe");
    assert_eq!(hit.suite(), "jammy");
    assert_eq!(
        archive.download_url(&hit).as_deref(),
        Some("https://mirror.test/ubuntu/pool/universe/r/redis/redis-server_6.0.16-1ubuntu1_amd64.deb")
    );

    assert_eq!(
        fetch.requests(),
        vec![
            url("jammy-security", "main"),
            url("jammy-updates", "main"),
            url("jammy", "main"),
            url("jammy-security", "universe"),
            url("jammy-updates", "universe"),
            url("jammy", "universe"),
        ]
    );
}

#[test]
fn main_hit_never_touches_universe() {
    let fetch = FakeFetch::new().with(&url("jammy", "main"), gzip(MAIN));
    let archive = archive(&fetch);

    let hit = archive.find("bash", "jammy", "amd64").unwrap();
    assert_eq!(hit.coordinate.component, "main");
    assert!(fetch.requests().iter().all(|u| !u.contains("/universe/")));
}

#[test]
fn loaded_and_failed_indices_are_cached() {
    let fetch = FakeFetch::new()
        .with(&url("jammy", "main"), gzip(MAIN))
        .with_status(&url("jammy-security", "main"), 503);
    let archive = archive(&fetch);

    assert!(archive.find("bash", "jammy", "amd64").is_some());
    let first = fetch.requests().len();
    assert!(archive.find("bash", "jammy", "amd64").is_some());
    assert_eq!(fetch.requests().len(), first);

    // Every coordinate is now loaded or cached empty; a miss costs nothing.
    assert!(archive.find("no-such-package", "jammy", "amd64").is_none());
    let after_miss = fetch.requests().len();
    assert!(archive.find("no-such-package", "jammy", "amd64").is_none());
    assert_eq!(fetch.requests().len(), after_miss);
    assert_eq!(archive.loaded(), 12);
}

#[test]
fn uncompressed_index_is_accepted() {
    let fetch = FakeFetch::new().with(&url("jammy", "main"), MAIN);
    let archive = archive(&fetch);
    assert!(archive.find("bash", "jammy", "amd64").is_some());
}

#[test]
fn clear_forces_reload() {
    let fetch = FakeFetch::new().with(&url("jammy", "main"), gzip(MAIN));
    let archive = archive(&fetch);
    archive.find("bash", "jammy", "amd64");
    let first = fetch.requests().len();
    archive.clear();
    archive.find("bash", "jammy", "amd64");
    assert_eq!(fetch.requests().len(), first * 2);
}
