//! Human-readable rendering of probe results.

use std::io::{self, Write};

use crate::layout::{LayoutReport, MenuToggle};
use crate::types::CheckResult;

const RULE: &str = "============================================================";

/// Write the full layout report: detail sections, checklist and verdict.
pub fn write_layout<W: Write>(out: &mut W, report: &LayoutReport) -> io::Result<()> {
    writeln!(out, "\n=== SIDEBAR STRUCTURE ===")?;
    match &report.sidebar {
        Some(sidebar) => {
            writeln!(out, "✓ Sidebar element found")?;
            writeln!(out, "  Classes: {}", sidebar.classes.join(" "))?;
            writeln!(out, "  ID: {}", sidebar.id.as_deref().unwrap_or(""))?;
            if report.sidebar_has_nav_menu {
                writeln!(out, "✓ NavMenu component found in sidebar")?;
            }
        }
        None => writeln!(out, "✗ Sidebar element NOT found")?,
    }

    writeln!(out, "\n=== MAIN CONTENT STRUCTURE ===")?;
    match &report.main_content {
        Some(main) => {
            writeln!(out, "✓ Main content element found")?;
            writeln!(out, "  ID: {}", main.id.as_deref().unwrap_or(""))?;
        }
        None => writeln!(out, "✗ Main content element NOT found")?,
    }

    writeln!(out, "\n=== PAGE WRAPPER ===")?;
    match &report.page_wrapper {
        Some(page) => {
            writeln!(out, "✓ Page wrapper found")?;
            writeln!(out, "  Classes: {}", page.classes.join(" "))?;
            writeln!(out, "  ID: {}", page.id.as_deref().unwrap_or(""))?;
        }
        None => writeln!(out, "✗ Page wrapper NOT found")?,
    }

    writeln!(out, "\n=== HAMBURGER MENU ===")?;
    match &report.menu_toggle {
        Some(MenuToggle::Button(button)) => {
            writeln!(out, "✓ Hamburger menu button found")?;
            writeln!(out, "  Classes: {}", button.classes.join(" "))?;
        }
        Some(MenuToggle::Icon) => writeln!(out, "✓ Hamburger icon found (fa-bars)")?,
        None => writeln!(out, "✗ Hamburger menu NOT found")?,
    }

    writeln!(out, "\n=== CSS FILES ===")?;
    for (name, href) in report.known_stylesheets() {
        if name == "bootstrap" {
            writeln!(out, "✓ Bootstrap CSS loaded")?;
        } else {
            writeln!(out, "✓ {name} loaded: {href}")?;
        }
    }

    writeln!(out, "\n=== LOGO ===")?;
    match &report.logo {
        Some(logo) => {
            writeln!(out, "✓ Logo image found: {}", logo.src)?;
            writeln!(out, "  Alt text: {}", logo.alt.as_deref().unwrap_or(""))?;
            if logo.inside_sidebar {
                writeln!(out, "✓ Logo is inside sidebar")?;
            }
        }
        None => writeln!(out, "✗ Logo image NOT found")?,
    }

    writeln!(out, "\n=== INLINE STYLES ===")?;
    if report.inline_sidebar_styles {
        if !report.inline_sidebar_rules.is_empty() {
            writeln!(out, "Found sidebar styles in <style> tag:")?;
            for rule in &report.inline_sidebar_rules {
                writeln!(out, "  {rule}...")?;
            }
        }
    } else {
        writeln!(out, "No inline sidebar styles found (styles in external CSS)")?;
    }

    writeln!(out, "\n=== BLAZOR COMPONENTS ===")?;
    if report.blazor_markers > 0 {
        writeln!(
            out,
            "✓ Blazor server-side rendering detected ({} markers)",
            report.blazor_markers
        )?;
    }
    if let Some(src) = &report.blazor_script {
        writeln!(out, "✓ Blazor script loaded: {src}")?;
    }

    writeln!(out, "\n{RULE}")?;
    writeln!(out, "LAYOUT VERIFICATION SUMMARY")?;
    writeln!(out, "{RULE}")?;
    write_checklist(out, &report.checks)?;

    if report.all_passed() {
        writeln!(
            out,
            "\n✅ All layout checks passed! The sidebar should be properly positioned."
        )?;
    } else {
        writeln!(out, "\n⚠️  Some checks failed. Review the layout configuration.")?;
    }
    Ok(())
}

/// One `✓ PASS` / `✗ FAIL` line per check, then the tally.
pub fn write_checklist<W: Write>(out: &mut W, checks: &[CheckResult]) -> io::Result<()> {
    for check in checks {
        let status = if check.passed { "✓ PASS" } else { "✗ FAIL" };
        writeln!(out, "{status}: {}", check.name)?;
    }
    let passed = checks.iter().filter(|c| c.passed).count();
    writeln!(out, "\nResults: {passed}/{} checks passed", checks.len())
}

/// Shorten a secret-ish value for display.
pub fn preview(value: &str, max_chars: usize) -> String {
    if value.chars().count() > max_chars {
        let head: String = value.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        value.to_string()
    }
}
