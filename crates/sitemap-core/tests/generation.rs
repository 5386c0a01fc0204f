#![allow(clippy::unwrap_used)]

use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use sitemap_core::writer::URLSET_HEADER;
use sitemap_core::{
    Error, FnSource, GenerationReport, IterSource, MaxFileSize, OptionalAttribute, PublishMode,
    SitemapConfig, SitemapGenerator, UrlRecord, serialize_entry,
};
use tempfile::TempDir;

fn records(locs: &[&str]) -> Vec<UrlRecord> {
    locs.iter().map(|loc| UrlRecord::new(*loc)).collect()
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

fn gunzip(path: &Path) -> Vec<u8> {
    let mut out = Vec::new();
    GzDecoder::new(fs::File::open(path).unwrap())
        .read_to_end(&mut out)
        .unwrap();
    out
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn run(config: SitemapConfig, groups: Vec<(&str, Vec<UrlRecord>)>) -> GenerationReport {
    let mut generator = SitemapGenerator::new(config).unwrap();
    for (name, group) in groups {
        generator.add_source(name, IterSource::new(group)).unwrap();
    }
    generator.generate().unwrap()
}

#[test]
fn count_limit_splits_group_and_index_lists_every_file() {
    let dir = TempDir::new().unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com/maps")
        .with_gzip(false)
        .with_max_urls(2);

    let report = run(config, vec![("pages", records(&["/a", "/b", "/c"]))]);

    assert!(report.is_clean());
    assert_eq!(report.groups[0].stats.rotations, 1);
    assert_eq!(
        file_names(dir.path()),
        vec!["sitemap.xml", "sitemap_pages_1.xml", "sitemap_pages_2.xml"]
    );

    let first = read(dir.path(), "sitemap_pages_1.xml");
    let second = read(dir.path(), "sitemap_pages_2.xml");
    assert_eq!(first.matches("<url>").count(), 2);
    assert!(first.contains("<loc>/a</loc>") && first.contains("<loc>/b</loc>"));
    assert_eq!(second.matches("<url>").count(), 1);
    assert!(second.contains("<loc>/c</loc>"));

    let index = read(dir.path(), "sitemap.xml");
    assert!(index.contains("<loc>https://example.com/maps/sitemap_pages_1.xml</loc>"));
    assert!(index.contains("<loc>https://example.com/maps/sitemap_pages_2.xml</loc>"));

    let stamps: Vec<&str> = index
        .split("<lastmod>")
        .skip(1)
        .map(|rest| rest.split("</lastmod>").next().unwrap())
        .collect();
    assert_eq!(stamps.len(), 2);
    assert_eq!(stamps[0], stamps[1]);
}

#[test]
fn byte_limit_places_one_entry_per_file() {
    let dir = TempDir::new().unwrap();
    let fragment = serialize_entry(&UrlRecord::new("/a"), &[]);
    let limit = (URLSET_HEADER.len() + fragment.len() * 3 / 2) as u64;
    let config = SitemapConfig::new(dir.path(), "https://example.com")
        .with_gzip(false)
        .with_optional_attributes(Vec::new())
        .with_max_file_size(MaxFileSize::from_bytes(limit));

    let report = run(config, vec![("pages", records(&["/a", "/b", "/c"]))]);

    assert_eq!(report.files.len(), 3);
    for name in &report.files {
        assert_eq!(read(dir.path(), name).matches("<url>").count(), 1);
    }
}

#[test]
fn disallowed_urls_never_reach_output() {
    let dir = TempDir::new().unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com")
        .with_gzip(false)
        .with_disallow_urls([r"/^\/admin/"]);

    let report = run(config, vec![("pages", records(&["/home", "/admin/x"]))]);

    let content = read(dir.path(), "sitemap_pages_1.xml");
    assert!(content.contains("<loc>/home</loc>"));
    assert!(!content.contains("admin"));
    assert_eq!(report.groups[0].stats.urls_disallowed, 1);
}

#[test]
fn optional_attributes_follow_configured_order() {
    let dir = TempDir::new().unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com")
        .with_gzip(false)
        .with_optional_attributes(vec![OptionalAttribute::Priority, OptionalAttribute::Image]);
    let record = UrlRecord::new("/search?q=a&page=2")
        .with_priority("0.8")
        .with_lastmod("2024-05-01")
        .with_image("<image:loc>https://example.com/a.png</image:loc>");

    run(config, vec![("pages", vec![record])]);

    let content = read(dir.path(), "sitemap_pages_1.xml");
    assert!(content.contains("<loc>/search?q=a&amp;page=2</loc>"));
    assert!(content.contains(concat!(
        "\t<priority>0.8</priority>\n",
        "\t<image:image><image:loc>https://example.com/a.png</image:loc></image:image>",
    )));
    assert!(!content.contains("<lastmod>"));
}

#[test]
fn compressed_files_match_plain_files() {
    let dir = TempDir::new().unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com").with_max_urls(10);
    let locs: Vec<String> = (0..25).map(|n| format!("https://example.com/p/{n}")).collect();
    let group: Vec<UrlRecord> = locs.iter().map(|loc| UrlRecord::new(loc.as_str())).collect();

    let report = run(config, vec![("pages", group)]);

    assert_eq!(report.files.len(), 3);
    for name in report.files.iter().map(String::as_str).chain(["sitemap.xml"]) {
        let plain = fs::read(dir.path().join(name)).unwrap();
        let unpacked = gunzip(&dir.path().join(format!("{name}.gz")));
        assert_eq!(plain, unpacked, "{name}");
    }

    let index = read(dir.path(), "sitemap.xml");
    assert!(index.contains("<loc>https://example.com/sitemap_pages_3.xml.gz</loc>"));
}

#[test]
fn repeated_runs_produce_identical_sitemaps() {
    let dir = TempDir::new().unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com").with_max_urls(2);
    let locs = ["/a", "/b", "/c", "/d", "/e"];

    let first = run(config.clone(), vec![("pages", records(&locs))]);
    let snapshot: Vec<Vec<u8>> = first
        .files
        .iter()
        .flat_map(|name| [name.clone(), format!("{name}.gz")])
        .map(|name| fs::read(dir.path().join(name)).unwrap())
        .collect();

    let second = run(config, vec![("pages", records(&locs))]);
    let again: Vec<Vec<u8>> = second
        .files
        .iter()
        .flat_map(|name| [name.clone(), format!("{name}.gz")])
        .map(|name| fs::read(dir.path().join(name)).unwrap())
        .collect();

    assert_eq!(first.files, second.files);
    assert_eq!(snapshot, again);
}

#[test]
fn publish_removes_stale_segments() {
    let dir = TempDir::new().unwrap();
    for name in ["sitemap_pages_2.xml", "sitemap_pages_3.xml", "sitemap_pages_3.xml.gz"] {
        fs::write(dir.path().join(name), "stale").unwrap();
    }
    fs::write(dir.path().join("sitemap_pages_extra_1.xml"), "other group").unwrap();

    let config = SitemapConfig::new(dir.path(), "https://example.com");
    run(config, vec![("pages", records(&["/a"]))]);

    assert_eq!(
        file_names(dir.path()),
        vec![
            "sitemap.xml",
            "sitemap.xml.gz",
            "sitemap_pages_1.xml",
            "sitemap_pages_1.xml.gz",
            "sitemap_pages_extra_1.xml",
        ]
    );
}

#[test]
fn per_group_index_is_cumulative() {
    let dir = TempDir::new().unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com").with_gzip(false);

    let report = run(
        config,
        vec![
            ("pages", records(&["/a"])),
            ("empty", Vec::new()),
            ("posts", records(&["/p/1"])),
        ],
    );

    assert_eq!(
        report.files,
        ["sitemap_pages_1.xml", "sitemap_empty_1.xml", "sitemap_posts_1.xml"]
    );
    let index = read(dir.path(), "sitemap.xml");
    assert_eq!(index.matches("<sitemap>").count(), 3);
    assert!(index.contains("sitemap_pages_1.xml"));
    assert!(index.contains("sitemap_empty_1.xml"));
    assert!(index.contains("sitemap_posts_1.xml"));
    assert_eq!(read(dir.path(), "sitemap_empty_1.xml").matches("<url>").count(), 0);
    assert!(!file_names(dir.path()).iter().any(|n| n.starts_with('_')));
}

#[test]
fn fully_disallowed_group_publishes_one_empty_file() {
    let dir = TempDir::new().unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com")
        .with_gzip(false)
        .with_disallow_urls([r"^/admin"]);

    let report = run(config, vec![("admin", records(&["/admin/a"]))]);

    let stats = &report.groups[0].stats;
    assert_eq!(stats.urls_disallowed, 1);
    assert_eq!(stats.files.len(), stats.rotations + 1);
    assert_eq!(
        file_names(dir.path()),
        vec!["sitemap.xml", "sitemap_admin_1.xml"]
    );
    assert!(!read(dir.path(), "sitemap_admin_1.xml").contains("<url>"));
}

#[test]
fn end_of_run_mode_publishes_once() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sitemap_posts_4.xml"), "stale").unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com")
        .with_gzip(false)
        .with_publish_mode(PublishMode::EndOfRun);

    run(
        config,
        vec![("pages", records(&["/a"])), ("posts", records(&["/p/1"]))],
    );

    assert_eq!(
        file_names(dir.path()),
        vec!["sitemap.xml", "sitemap_pages_1.xml", "sitemap_posts_1.xml"]
    );
    assert_eq!(read(dir.path(), "sitemap.xml").matches("<sitemap>").count(), 2);
}

#[test]
fn failing_group_does_not_affect_others() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sitemap_broken_1.xml"), "previous run").unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com").with_gzip(false);

    let mut generator = SitemapGenerator::new(config).unwrap();
    let mut fetched = false;
    generator
        .add_source(
            "broken",
            FnSource::new(move |_| {
                if fetched {
                    return Err(Error::Source {
                        group: "broken".into(),
                        message: "query timed out".into(),
                    });
                }
                fetched = true;
                Ok(Some(records(&["/x"])))
            }),
        )
        .unwrap()
        .add_source("posts", IterSource::new(records(&["/p/1"])))
        .unwrap();

    let report = generator.generate().unwrap();

    assert!(!report.groups[0].succeeded());
    assert_eq!(report.groups[0].error.as_ref().unwrap().category(), "source");
    assert!(report.groups[1].succeeded());
    assert_eq!(report.files, ["sitemap_broken_1.xml", "sitemap_posts_1.xml"]);
    assert_eq!(read(dir.path(), "sitemap_broken_1.xml"), "previous run");
    assert!(!dir.path().join("_sitemap_broken_1.xml").exists());
}

fn flaky_source(fail: bool) -> impl sitemap_core::BatchSource<Record = UrlRecord> {
    let mut done = false;
    FnSource::new(move |_| {
        if fail {
            return Err(Error::Source {
                group: "catalog".into(),
                message: "database unavailable".into(),
            });
        }
        if done {
            return Ok(None);
        }
        done = true;
        Ok(Some(records(&["/c/1", "/c/2", "/c/3"])))
    })
}

#[test]
fn failed_group_keeps_its_published_files_in_the_index() {
    let dir = TempDir::new().unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com").with_max_urls(2);

    let mut first = SitemapGenerator::new(config.clone()).unwrap();
    first
        .add_source("catalog", flaky_source(false))
        .unwrap()
        .add_source("posts", IterSource::new(records(&["/p/1"])))
        .unwrap();
    let first = first.generate().unwrap();
    assert!(first.is_clean());

    let mut second = SitemapGenerator::new(config).unwrap();
    second
        .add_source("catalog", flaky_source(true))
        .unwrap()
        .add_source("posts", IterSource::new(records(&["/p/1", "/p/2"])))
        .unwrap();
    let second = second.generate().unwrap();

    assert!(!second.groups[0].succeeded());
    assert_eq!(
        second.files,
        ["sitemap_catalog_1.xml", "sitemap_catalog_2.xml", "sitemap_posts_1.xml"]
    );
    let index = read(dir.path(), "sitemap.xml");
    assert!(index.contains("<loc>https://example.com/sitemap_catalog_1.xml.gz</loc>"));
    assert!(index.contains("<loc>https://example.com/sitemap_catalog_2.xml.gz</loc>"));
    assert!(dir.path().join("sitemap_catalog_2.xml.gz").is_file());
    assert_eq!(read(dir.path(), "sitemap_posts_1.xml").matches("<url>").count(), 2);
}

#[test]
fn compression_failure_is_reported_and_segments_still_publish() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("_sitemap_pages_1.xml.gz")).unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com").with_max_urls(1);

    let report = run(config, vec![("pages", records(&["/a", "/b"]))]);

    assert_eq!(
        report.issues.iter().map(Error::category).collect::<Vec<_>>(),
        ["compression"]
    );
    assert_eq!(report.groups[0].stats.urls_written, 2);
    assert!(dir.path().join("sitemap_pages_1.xml").is_file());
    assert!(dir.path().join("sitemap_pages_2.xml").is_file());
    assert!(dir.path().join("sitemap_pages_2.xml.gz").is_file());

    let index = read(dir.path(), "sitemap.xml");
    assert!(index.contains("<loc>https://example.com/sitemap_pages_1.xml</loc>"));
    assert!(index.contains("<loc>https://example.com/sitemap_pages_2.xml.gz</loc>"));
}

#[test]
fn index_write_failure_still_replaces_segments() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sitemap.xml"), "previous index").unwrap();
    fs::write(dir.path().join("sitemap_pages_3.xml"), "stale").unwrap();
    // A directory at the staged index path makes the index write fail.
    fs::create_dir(dir.path().join("_sitemap.xml")).unwrap();
    let config = SitemapConfig::new(dir.path(), "https://example.com")
        .with_gzip(false)
        .with_max_urls(1);

    let report = run(config, vec![("pages", records(&["/a", "/b"]))]);

    assert_eq!(
        report.issues.iter().map(Error::category).collect::<Vec<_>>(),
        ["file_write"]
    );
    assert!(!dir.path().join("sitemap_pages_3.xml").exists());
    assert!(dir.path().join("sitemap_pages_1.xml").is_file());
    assert!(dir.path().join("sitemap_pages_2.xml").is_file());
    assert_eq!(read(dir.path(), "sitemap.xml"), "previous index");
}

#[test]
fn config_file_drives_a_run() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let config_path = dir.path().join("sitemap.toml");
    fs::write(
        &config_path,
        format!(
            concat!(
                "sitemap_directory = {:?}\n",
                "base_url = \"https://example.com\"\n",
                "gzipped = false\n",
                "max_urls_count_in_file = 1\n",
                "max_file_size = \"1m\"\n",
            ),
            out.display().to_string()
        ),
    )
    .unwrap();

    let config = SitemapConfig::load(&config_path).unwrap();
    assert_eq!(config.max_file_size.bytes(), 1024 * 1024);

    let report = run(config, vec![("pages", records(&["/a", "/b"]))]);
    assert_eq!(report.files.len(), 2);
    assert!(out.join("sitemap_pages_2.xml").exists());
}
