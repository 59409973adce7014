use std::path::{Path, PathBuf};

use article_viewer::ViewerConfig;
use article_viewer_web::{check_site, CheckOrigin};

fn site_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/site")
}

#[test]
fn check_walks_tabs_and_aux_buttons() {
    let report = check_site(&site_root(), "index.html", &ViewerConfig::default())
        .expect("fixture site should check");
    assert_eq!(report.tabs, 4);

    let visited: Vec<(&CheckOrigin, &str)> = report
        .fragments
        .iter()
        .map(|c| (&c.origin, c.path.as_str()))
        .collect();
    assert_eq!(
        visited,
        [
            (&CheckOrigin::Tab("涅波絲經".to_string()), "articles/涅波絲經.html"),
            (
                &CheckOrigin::Aux("np-audio-btn".to_string()),
                "articles/涅波絲經有聲書.html"
            ),
            (
                &CheckOrigin::Aux("np-en-btn".to_string()),
                "articles/涅波絲經英文版.html"
            ),
            (&CheckOrigin::Tab("涅波史記".to_string()), "articles/涅波史記.html"),
            (&CheckOrigin::Tab("涅波教聞".to_string()), "articles/涅波教聞.html"),
            (&CheckOrigin::Tab("涅波外傳".to_string()), "articles/涅波外傳.html"),
        ]
    );
}

#[test]
fn check_reports_missing_fragment() {
    let report = check_site(&site_root(), "index.html", &ViewerConfig::default())
        .expect("fixture site should check");
    assert!(!report.is_clean());
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, "articles/涅波外傳.html");
    assert_eq!(
        failures[0].error.as_deref(),
        Some("fragment unavailable (status 404)")
    );
}

#[test]
fn check_summarises_rendered_fragments() {
    let report = check_site(&site_root(), "index.html", &ViewerConfig::default())
        .expect("fixture site should check");
    let main = &report.fragments[0];
    assert!(main.rendered);
    assert!(main.aux_row);
    assert_eq!(main.sections, 2);
    assert_eq!(main.cheers, 1);
    assert_eq!(main.title, "涅波絲經");

    let audio = &report.fragments[1];
    assert_eq!(audio.rewritten, 0);

    let json = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(json["fragments"][0]["origin"]["kind"], "tab");
    assert!(json["fragments"][0].get("error").is_none());
    assert_eq!(json["fragments"][5]["error"], "fragment unavailable (status 404)");
}

#[test]
fn check_rejects_missing_shell() {
    let err = check_site(&site_root(), "nope.html", &ViewerConfig::default())
        .expect_err("missing shell");
    assert!(err.contains("nope.html"));
}
