//! Tool availability check.

use console::style;

use crate::ocr::{check_pdftoppm_hint, check_tools, OcrBackend, TesseractBackend};

/// Check OCR and rasterization tool availability.
pub async fn cmd_check() -> anyhow::Result<()> {
    println!("\n{}", style("Tool Status").bold());
    println!("{}", "-".repeat(50));

    let tools = check_tools();
    let mut all_found = true;
    for (tool, available) in &tools {
        let status = if *available {
            style("✓ found").green()
        } else {
            all_found = false;
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, status);
    }

    let tesseract = TesseractBackend::new();
    if !tesseract.is_available() {
        println!("\n  {}", style(tesseract.availability_hint()).dim());
    }
    if let Some(hint) = check_pdftoppm_hint() {
        println!("  {}", style(hint).dim());
        println!(
            "  {}",
            style("(only needed for PDF input; page images work without it)").dim()
        );
    }

    println!();
    if all_found {
        println!("{} All tools are available", style("✓").green());
    } else {
        println!("{} Some tools are missing", style("!").yellow());
    }

    Ok(())
}
