//! Streaming readers for `repomd.xml` and `primary.xml`.
//!
//! Elements are matched by local name, so the default `common` namespace and
//! the `rpm:` namespace inside `<format>` need no special handling.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::record::PackageRecord;

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The `href` of the `primary` data entry in `repomd.xml`.
pub fn primary_location(repomd: &[u8]) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_reader(repomd);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut in_primary = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"data" => {
                in_primary = attribute(&e, b"type").as_deref() == Some("primary");
            }
            Event::Start(e) | Event::Empty(e)
                if in_primary && e.local_name().as_ref() == b"location" =>
            {
                if let Some(href) = attribute(&e, b"href") {
                    return Ok(Some(href));
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"data" => in_primary = false,
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Text-bearing elements of a `<package>` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Name,
    Arch,
    Summary,
    Description,
    Packager,
    Url,
    Checksum,
    License,
    Vendor,
}

impl TextField {
    fn from_tag(tag: &[u8], in_format: bool) -> Option<Self> {
        match (tag, in_format) {
            (b"name", false) => Some(Self::Name),
            (b"arch", false) => Some(Self::Arch),
            (b"summary", false) => Some(Self::Summary),
            (b"description", false) => Some(Self::Description),
            (b"packager", false) => Some(Self::Packager),
            (b"url", false) => Some(Self::Url),
            (b"checksum", false) => Some(Self::Checksum),
            (b"license", true) => Some(Self::License),
            (b"vendor", true) => Some(Self::Vendor),
            _ => None,
        }
    }
}

/// `epoch:version-release`, with the epoch left out when it is zero.
pub fn build_evr(epoch: Option<&str>, version: &str, release: &str) -> String {
    let evr = if release.is_empty() {
        version.to_string()
    } else {
        format!("{version}-{release}")
    };
    match epoch {
        Some(epoch) if !epoch.is_empty() && epoch != "0" => format!("{epoch}:{evr}"),
        _ => evr,
    }
}

#[derive(Default)]
struct PackageState {
    record: PackageRecord,
    has_version: bool,
    checksum_type: Option<String>,
}

impl PackageState {
    fn set(&mut self, field: TextField, text: String) {
        let record = &mut self.record;
        match field {
            TextField::Name => record.name = text,
            TextField::Arch => record.arch = Some(text),
            TextField::Summary => record.summary = Some(text),
            TextField::Description => record.description = Some(text),
            TextField::Packager => record.maintainer = Some(text),
            TextField::Url => record.homepage = Some(text),
            TextField::License => record.license = Some(text),
            TextField::Vendor => record.vendor = Some(text),
            TextField::Checksum => {
                let algorithm = self
                    .checksum_type
                    .take()
                    .unwrap_or_else(|| "unknown".to_string());
                record.checksum = Some((algorithm, text));
            }
        }
    }

    fn start(&mut self, element: &BytesStart<'_>) {
        match element.local_name().as_ref() {
            b"version" => {
                let version = attribute(element, b"ver").unwrap_or_default();
                let release = attribute(element, b"rel").unwrap_or_default();
                let epoch = attribute(element, b"epoch");
                self.record.version = build_evr(epoch.as_deref(), &version, &release);
                self.has_version = true;
            }
            b"location" => self.record.location = attribute(element, b"href"),
            b"checksum" => self.checksum_type = attribute(element, b"type"),
            _ => {}
        }
    }

    fn finish(self) -> Option<PackageRecord> {
        (self.has_version && !self.record.name.is_empty()).then_some(self.record)
    }
}

/// Parse every `<package type="rpm">` entry in `primary.xml`.
///
/// Entries without a name or `<version>` are skipped. Duplicates are kept in
/// document order; indexing them by name keeps the last.
pub fn parse_primary(xml: &[u8]) -> Result<Vec<PackageRecord>, quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut packages = Vec::new();
    let mut current: Option<PackageState> = None;
    let mut in_format = false;
    let mut field: Option<TextField> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let tag = e.local_name();
                if tag.as_ref() == b"package" {
                    let kind = attribute(&e, b"type");
                    current = match kind.as_deref() {
                        None | Some("rpm") => Some(PackageState::default()),
                        Some(_) => None,
                    };
                    in_format = false;
                } else if let Some(state) = current.as_mut() {
                    if tag.as_ref() == b"format" {
                        in_format = true;
                    }
                    state.start(&e);
                    field = TextField::from_tag(tag.as_ref(), in_format);
                    text.clear();
                }
            }
            Event::Empty(e) => {
                if let Some(state) = current.as_mut() {
                    state.start(&e);
                }
            }
            Event::Text(t) if field.is_some() => text.push_str(&t.unescape()?),
            Event::CData(c) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"package" => {
                    if let Some(record) = current.take().and_then(PackageState::finish) {
                        packages.push(record);
                    }
                }
                b"format" => in_format = false,
                _ => {
                    if let (Some(state), Some(f)) = (current.as_mut(), field.take()) {
                        let value = text.trim();
                        if !value.is_empty() {
                            state.set(f, value.to_string());
                        }
                    }
                    text.clear();
                }
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(packages)
}
