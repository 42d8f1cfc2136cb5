//! Shared fixtures and output inspection helpers.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use regex::bytes::Regex;
use sdx_report::{
    ChartSpec, CoverConfig, ModuleOutput, RecommendationRow, RecommendationTableGroup, ReportJob,
};
use std::io::{Cursor, Read};

pub fn cover() -> CoverConfig {
    CoverConfig::new("Acme Logistics", "Q3 2026")
        .with_generated_at(Utc.with_ymd_and_hms(2026, 10, 1, 9, 30, 0).unwrap())
}

pub fn bar_chart(title: &str) -> ChartSpec {
    ChartSpec::new(title, "bar")
        .with_categories(["Jul", "Aug", "Sep"])
        .with_series("Opened", vec![420.0, 388.0, 451.0])
        .with_series("Closed", vec![401.0, 395.0, 430.0])
}

pub fn rows(count: usize) -> Vec<RecommendationRow> {
    (0..count)
        .map(|i| RecommendationRow {
            recommendation: format!("Action {}", i + 1),
            explanation: "Reduce reopen rate".to_string(),
            benefit: "Fewer touches".to_string(),
            cost_calculation: "2h x 40".to_string(),
            evidence: "Reopen 12%".to_string(),
        })
        .collect()
}

/// A module with one chart, two short paragraphs and a cost table.
pub fn full_module(title: &str, table_rows: usize) -> ModuleOutput {
    ModuleOutput::new(title)
        .with_chart(bar_chart(&format!("{} trend", title)))
        .with_paragraph(format!("{} stayed within target for the period.", title))
        .with_paragraph("Two priority incidents breached their response window.")
        .with_recommendations(RecommendationTableGroup {
            cost: rows(table_rows),
            ..Default::default()
        })
}

pub fn job(modules: Vec<ModuleOutput>) -> ReportJob {
    let mut job = ReportJob::new(cover())
        .with_kpi("Tickets opened", "1,259")
        .with_kpi("Mean time to resolve", "7.4 h");
    job.modules = modules;
    job
}

/// Inflated page content streams of a PDF, in page order.
///
/// Image XObjects are skipped.
pub fn pdf_pages(bytes: &[u8]) -> Vec<String> {
    let stream = Regex::new(r"<<((?:[^<>]|<<[^<>]*>>)*)>>\s*stream\r?\n").unwrap();
    let length = Regex::new(r"/Length (\d+)").unwrap();
    let mut pages = Vec::new();
    for caps in stream.captures_iter(bytes) {
        let dict = caps.get(1).unwrap().as_bytes();
        if dict.windows(6).any(|w| w == b"/Image") {
            continue;
        }
        let len: usize = length
            .captures(dict)
            .map(|c| String::from_utf8_lossy(&c[1]).parse().unwrap())
            .unwrap();
        let start = caps.get(0).unwrap().end();
        let data = &bytes[start..start + len];
        let raw = miniz_oxide::inflate::decompress_to_vec_zlib(data).unwrap();
        pages.push(String::from_utf8_lossy(&raw).into_owned());
    }
    pages
}

/// Strings shown with `Tj` on a page.
pub fn shown_text(page: &str) -> Vec<String> {
    let shown = regex::Regex::new(r"\(((?:[^()\\]|\\.)*)\) Tj").unwrap();
    shown
        .captures_iter(page)
        .map(|c| c[1].replace("\\(", "(").replace("\\)", ")"))
        .collect()
}

/// Outline (bookmark) titles of a PDF, in order.
pub fn pdf_outline(bytes: &[u8], report_title: &str) -> Vec<String> {
    let title = Regex::new(r"/Title \(((?:[^()\\]|\\.)*)\)").unwrap();
    title
        .captures_iter(bytes)
        .map(|c| String::from_utf8_lossy(&c[1]).into_owned())
        .filter(|t| t != report_title)
        .collect()
}

pub fn docx_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    text
}

/// Level-1 headings of the DOCX body, in order.
pub fn docx_section_titles(bytes: &[u8]) -> Vec<String> {
    let xml = docx_entry(bytes, "word/document.xml");
    let heading = regex::Regex::new(
        r#"<w:pStyle w:val="Heading1"/></w:pPr><w:bookmarkStart w:id="\d+" w:name="_sdx_section_(\d+)"/><w:r><w:t xml:space="preserve">([^<]*)</w:t>"#,
    )
    .unwrap();
    heading
        .captures_iter(&xml)
        .map(|c| c[2].to_string())
        .collect()
}
