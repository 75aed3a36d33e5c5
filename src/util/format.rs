//! Plain-text rendering for printing, email bodies and the terminal.

use std::fmt::Write;

use crate::domain::{format_money, money::format_quantity, FitResult, QuoteRequest, QuoteResult};

const LABEL_WIDTH: usize = 22;
const DETAIL_WIDTH: usize = 40;
const AMOUNT_WIDTH: usize = 12;

fn line(out: &mut String, label: &str, detail: &str, amount: f64) {
    let _ = writeln!(
        out,
        "  {label:<LABEL_WIDTH$}{detail:<DETAIL_WIDTH$}{:>AMOUNT_WIDTH$}",
        format_money(amount)
    );
}

fn rule(out: &mut String) {
    let _ = writeln!(out, "  {}", "-".repeat(LABEL_WIDTH + DETAIL_WIDTH + AMOUNT_WIDTH));
}

/// Printable quote: lane, transportation lines, fuel, accessorials, totals.
pub fn format_quote(request: &QuoteRequest, result: &QuoteResult) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Quote: {} {} ({} service)",
        request.tariff_key().hub,
        request.vehicle_type.label(),
        request.service_type
    );
    let _ = write!(
        out,
        "Distance {} mi, weight {} lb",
        format_quantity(request.distance_miles),
        format_quantity(request.weight_lb)
    );
    if request.deadhead_miles > 0.0 {
        let _ = write!(out, ", deadhead {} mi", format_quantity(request.deadhead_miles));
    }
    out.push_str("\n\n");

    for charge in result.charge_lines() {
        line(&mut out, &charge.label, &charge.detail, charge.amount);
    }
    rule(&mut out);
    line(&mut out, "Transportation", "", result.transportation_subtotal);
    line(
        &mut out,
        "Fuel Surcharge",
        &format!("{}% of transportation", format_quantity(result.fuel_surcharge_pct)),
        result.fuel_surcharge,
    );

    if !result.accessorials.is_empty() {
        out.push('\n');
        for accessorial in &result.accessorials {
            line(&mut out, &accessorial.label, &accessorial.detail, accessorial.amount);
        }
        rule(&mut out);
        line(&mut out, "Accessorials", "", result.accessorial_subtotal);
    }

    out.push('\n');
    line(&mut out, "TOTAL", "", result.total);

    if let Some(discount) = &result.discount {
        line(
            &mut out,
            "Win-Client Discount",
            &format!("{}% off", format_quantity(discount.pct)),
            -discount.amount,
        );
        line(&mut out, "DISCOUNTED TOTAL", "", discount.discounted_total);
    }

    out
}

/// One row per vehicle with its status and every reason.
pub fn format_fit_table(hub: &str, results: &[FitResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Fleet fit at {hub}:");

    if results.is_empty() {
        out.push_str("  no fleet on record for this hub\n");
        return out;
    }

    for result in results {
        let _ = writeln!(
            out,
            "  {:<8} {} ({})",
            result.status.label(),
            result.vehicle_name,
            result.category.label()
        );
        for reason in &result.reasons {
            let _ = writeln!(out, "           - {reason}");
        }
    }
    out
}
