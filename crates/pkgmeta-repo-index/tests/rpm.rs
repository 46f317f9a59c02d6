mod common;

use common::{FakeFetch, gzip};
use pkgmeta_repo_index::rpm::{RpmDistro, RpmRepositories};

const ROCKY_BASEOS: &str = "https://download.rockylinux.org/pub/rocky/9/BaseOS/x86_64/os/";
const ROCKY_APPSTREAM: &str = "https://download.rockylinux.org/pub/rocky/9/AppStream/x86_64/os/";

const REPOMD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo">
  <data type="primary">
    <location href="repodata/0a1b-primary.xml.gz"/>
  </data>
</repomd>"#;

const BASEOS_PRIMARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
<package type="rpm">
  <name>openssl</name>
  <arch>x86_64</arch>
  <version epoch="1" ver="3.0.7" rel="24.el9"/>
  <summary>Utilities from the general purpose cryptography library with TLS implementation</summary>
  <packager>Rocky Linux Build System (Peridot) &lt;releng@rockylinux.org&gt;</packager>
  <url>http://www.openssl.org/</url>
  <location href="Packages/o/openssl-3.0.7-24.el9.x86_64.rpm"/>
  <format>
    <rpm:license>ASL 2.0</rpm:license>
    <rpm:vendor>Rocky Enterprise Software Foundation</rpm:vendor>
  </format>
</package>
<package type="rpm">
  <name>openssl</name>
  <arch>x86_64</arch>
  <version epoch="1" ver="3.0.7" rel="27.el9"/>
  <location href="Packages/o/openssl-3.0.7-27.el9.x86_64.rpm"/>
  <format>
    <rpm:license>Apache-2.0</rpm:license>
  </format>
</package>
</metadata>"#;

const APPSTREAM_PRIMARY: &str = r#"<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
<package type="rpm">
  <name>nginx</name>
  <arch>x86_64</arch>
  <version epoch="2" ver="1.20.1" rel="14.el9"/>
  <summary>A high performance web server and reverse proxy server</summary>
  <url>https://nginx.org</url>
  <location href="Packages/n/nginx-1.20.1-14.el9.x86_64.rpm"/>
  <format><rpm:license>BSD</rpm:license></format>
</package>
</metadata>"#;

fn rocky_fetch() -> FakeFetch {
    FakeFetch::new()
        .with(&format!("{ROCKY_BASEOS}repodata/repomd.xml"), REPOMD)
        .with(
            &format!("{ROCKY_BASEOS}repodata/0a1b-primary.xml.gz"),
            gzip(BASEOS_PRIMARY),
        )
        .with(&format!("{ROCKY_APPSTREAM}repodata/repomd.xml"), REPOMD)
        .with(
            &format!("{ROCKY_APPSTREAM}repodata/0a1b-primary.xml.gz"),
            gzip(APPSTREAM_PRIMARY),
        )
}

#[test]
fn finds_package_in_baseos_last_entry_wins() {
    let fetch = rocky_fetch();
    let repos = RpmRepositories::new(&fetch);

    let hit = repos.find("openssl", RpmDistro::Rocky, Some("9"), "x86_64").unwrap();
    assert_eq!(hit.record.version, "1:3.0.7-27.el9");
    assert_eq!(hit.coordinate.repo, "BaseOS");
    assert_eq!(
        hit.download_url().as_deref(),
        Some("https://download.rockylinux.org/pub/rocky/9/BaseOS/x86_64/os/Packages/o/openssl-3.0.7-27.el9.x86_64.rpm")
    );
    assert!(fetch.requests().iter().all(|u| !u.contains("AppStream")));
}

#[test]
fn falls_through_to_appstream() {
    let fetch = rocky_fetch();
    let repos = RpmRepositories::new(&fetch);

    let hit = repos.find("nginx", RpmDistro::Rocky, Some("9"), "x86_64").unwrap();
    assert_eq!(hit.coordinate.repo, "AppStream");
    assert_eq!(hit.record.license.as_deref(), Some("BSD"));
    assert_eq!(hit.record.supplier(), None);

    let requests = fetch.requests();
    assert_eq!(requests.len(), 4);
    assert!(requests[0].starts_with(ROCKY_BASEOS));
    assert!(requests[2].starts_with(ROCKY_APPSTREAM));

    // Both repositories are cached now.
    repos.find("openssl", RpmDistro::Rocky, Some("9"), "x86_64").unwrap();
    assert_eq!(fetch.requests().len(), 4);
    assert_eq!(repos.loaded(), 2);
}

#[test]
fn missing_primary_caches_empty_index() {
    let fetch = FakeFetch::new().with(
        &format!("{ROCKY_BASEOS}repodata/repomd.xml"),
        "<repomd><data type=\"other\"/></repomd>",
    );
    let repos = RpmRepositories::new(&fetch);

    assert!(repos.find("openssl", RpmDistro::Rocky, Some("9"), "x86_64").is_none());
    let first = fetch.requests().len();
    assert!(repos.find("openssl", RpmDistro::Rocky, Some("9"), "x86_64").is_none());
    assert_eq!(fetch.requests().len(), first);
}

#[test]
fn amazon_linux_resolves_mirror_list() {
    let mirror_list = "https://cdn.amazonlinux.com/al2023/core/mirrors/latest/x86_64/mirror.list";
    let mirror = "https://al2023-repos.example.test/core/guids/abc/x86_64";
    let fetch = FakeFetch::new()
        .with(mirror_list, format!("# mirrors\n{mirror}\n"))
        .with(&format!("{mirror}/repodata/repomd.xml"), REPOMD)
        .with(
            &format!("{mirror}/repodata/0a1b-primary.xml.gz"),
            gzip(APPSTREAM_PRIMARY),
        );
    let repos = RpmRepositories::new(&fetch);

    let hit = repos
        .find("nginx", RpmDistro::AmazonLinux, Some("2023"), "x86_64")
        .unwrap();
    assert_eq!(hit.base_url, format!("{mirror}/"));
    assert_eq!(fetch.requests()[0], mirror_list);
}

#[test]
fn unsupported_version_is_not_fetched() {
    let fetch = FakeFetch::new();
    let repos = RpmRepositories::new(&fetch);
    assert!(repos.find("bash", RpmDistro::Rocky, Some("7"), "x86_64").is_none());
    assert!(fetch.requests().is_empty());
}
