//! Cross-format fidelity tests.
//!
//! Both backends consume one IR, so section order must agree between the
//! PDF outline, the DOCX body and the input; the contents page numbers must
//! match where the PDF backend actually drew each heading.

mod common;

use common::*;
use sdx_report::backend::{self, PdfBackend};
use sdx_report::{GeneratorConfig, ModuleOutput, OutputFormat, ReportGenerator};

fn generator() -> ReportGenerator {
    ReportGenerator::new(
        GeneratorConfig::default()
            .with_asset_size(480, 270)
            .with_warnings_appendix(false),
    )
}

fn mixed_modules() -> Vec<ModuleOutput> {
    let long = "Escalations were driven by a small set of recurring network faults. "
        .repeat(150);
    vec![
        full_module("Ticket volume", 4),
        ModuleOutput::new("Knowledge base").with_paragraph(long),
        full_module("Recommendations", 30),
        ModuleOutput::new("Problem management"),
        full_module("Customer satisfaction", 2),
    ]
}

#[test]
fn section_order_matches_across_formats() {
    let job = job(mixed_modules());
    let report = generator().generate(&job).unwrap();

    let expected: Vec<String> = job.modules.iter().map(|m| m.title.clone()).collect();
    let toc: Vec<String> = report.toc.iter().map(|e| e.title().to_string()).collect();
    assert_eq!(toc, expected);

    let pdf = report.output(OutputFormat::Pdf).unwrap();
    assert_eq!(pdf_outline(pdf, &job.cover.report_title), expected);

    let docx = report.output(OutputFormat::Docx).unwrap();
    assert_eq!(docx_section_titles(docx), expected);
}

#[test]
fn toc_pages_match_drawn_headings() {
    let generator = generator();
    let prepared = generator.prepare(&job(mixed_modules())).unwrap();
    let composition = generator.composer().compose(&prepared.document);
    let rendering = backend::drive(&composition.ir, PdfBackend::new(&composition.ir)).unwrap();

    let toc_pages: Vec<usize> = composition.toc().iter().map(|e| e.page()).collect();
    assert_eq!(rendering.heading_pages, toc_pages);
    assert!(toc_pages.windows(2).all(|w| w[0] < w[1]), "{:?}", toc_pages);
    // The long narrative and the 30-row table both span pages.
    assert!(composition.ir.page_count > toc_pages.len() + 2 + 2);

    let pages = pdf_pages(&rendering.bytes);
    for entry in composition.toc() {
        let shown = shown_text(&pages[entry.page() - 1]);
        assert!(
            shown.iter().any(|t| t == entry.title()),
            "'{}' not drawn on page {}",
            entry.title(),
            entry.page()
        );
    }
}

#[test]
fn contents_lists_resolved_pages() {
    let generator = generator();
    let report = generator.generate(&job(mixed_modules())).unwrap();

    let pages = pdf_pages(report.output(OutputFormat::Pdf).unwrap());
    let contents = shown_text(&pages[1]);
    for entry in &report.toc {
        assert!(contents.contains(&entry.title().to_string()));
        assert!(contents.contains(&entry.page().to_string()));
    }

    let xml = docx_entry(report.output(OutputFormat::Docx).unwrap(), "word/document.xml");
    for i in 0..report.toc.len() {
        assert!(xml.contains(&format!(r#"w:instr=" PAGEREF _sdx_section_{} \h ""#, i)));
        assert!(xml.contains(&format!(r#"w:name="_sdx_section_{}""#, i)));
    }
}

#[test]
fn generation_is_deterministic() {
    let generator = generator();
    let job = job(mixed_modules());
    let first = generator.generate(&job).unwrap();
    let second = generator.generate(&job).unwrap();
    assert_eq!(first.outputs, second.outputs);
    assert_eq!(first.toc, second.toc);
}

#[test]
fn empty_section_renders_title_and_placeholder() {
    let generator = generator();
    let job = job(vec![ModuleOutput::new("Problem management")]);
    let report = generator.generate(&job).unwrap();

    assert_eq!(report.page_count, 3);
    let pages = pdf_pages(report.output(OutputFormat::Pdf).unwrap());
    let shown = shown_text(&pages[2]);
    assert!(shown.contains(&"Problem management".to_string()));
    assert!(
        shown.iter().any(|t| t.starts_with("No data available for")),
        "{:?}",
        shown
    );

    let xml = docx_entry(report.output(OutputFormat::Docx).unwrap(), "word/document.xml");
    let heading = xml.find("Problem management</w:t>").unwrap();
    let notice = xml.rfind("No data available for").unwrap();
    assert!(heading < notice);
}

#[test]
fn docx_package_is_complete() {
    let report = generator()
        .generate(&job(vec![full_module("Ticket volume", 2)]))
        .unwrap();
    let docx = report.output(OutputFormat::Docx).unwrap();

    let archive = zip::ZipArchive::new(std::io::Cursor::new(docx)).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert!(names.contains(&"word/media/image1.png"));
    let rels = docx_entry(docx, "word/_rels/document.xml.rels");
    assert!(rels.contains(r#"Target="media/image1.png""#));
    let core = docx_entry(docx, "docProps/core.xml");
    assert!(core.contains("2026-10-01T09:30:00Z"));
}
