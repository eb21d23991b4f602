use calproxy::config::UpstreamConfig;
use calproxy::pipeline::{build_http_client, Credentials, SourceFetcher};
use calproxy::Metrics;
use std::sync::Arc;
use url::Url;

pub const USER: &str = "reader";
pub const PASS: &str = "secret";

/// Creates a fetcher with the test credentials and its metrics
pub fn create_fetcher() -> (Arc<SourceFetcher>, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new());
    let client = build_http_client(&UpstreamConfig::default()).expect("Failed to build client");
    let fetcher = SourceFetcher::new(client, Credentials::new(USER, PASS), Arc::clone(&metrics));
    (Arc::new(fetcher), metrics)
}

pub fn index_url(base: &str) -> Url {
    Url::parse(&format!("{}/index.html", base)).expect("Failed to parse base URL")
}

/// An index page listing the given paths, one per row
pub fn index_page(paths: &[&str]) -> String {
    let rows: String = paths
        .iter()
        .map(|p| {
            format!(
                r#"<tr><td class="nameColumn"><a href="{}">{}</a></td><td class="sizeColumn"><a href="/details{}">details</a></td></tr>"#,
                p, p, p
            )
        })
        .collect();
    format!(
        r#"<html><head><title>Index</title></head><body><section><table class="nodeTable">{}</table></section></body></html>"#,
        rows
    )
}

/// A feed with one VEVENT per uid and an optional VTIMEZONE
pub fn feed(uids: &[&str], timezone: Option<&str>) -> String {
    let mut out = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//Source//EN\r\n");
    if let Some(tzid) = timezone {
        out.push_str(&format!(
            "BEGIN:VTIMEZONE\r\nTZID:{}\r\nBEGIN:STANDARD\r\nDTSTART:19700101T000000\r\nTZOFFSETFROM:+0100\r\nTZOFFSETTO:+0100\r\nEND:STANDARD\r\nEND:VTIMEZONE\r\n",
            tzid
        ));
    }
    for uid in uids {
        out.push_str(&format!(
            "BEGIN:VEVENT\r\nUID:{}\r\nDTSTAMP:20240101T000000Z\r\nDTSTART:20240102T100000Z\r\nSUMMARY:Event {}\r\nEND:VEVENT\r\n",
            uid, uid
        ));
    }
    out.push_str("END:VCALENDAR\r\n");
    out
}
