//! HTML bill statement
//!
//! Renders a self-contained, printable HTML statement: header with the
//! statement number and status, the owner and tenant blocks, the
//! consumption table and both meter photos.

use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

use core_kernel::{Money, PortError};
use domain_billing::{BillView, Statement, StatementRenderer};

const STYLES: &str = "\
body{font-family:Helvetica,Arial,sans-serif;padding:40px;color:#333;line-height:1.4}\
.header{display:flex;justify-content:space-between;border-bottom:2px solid #2563eb;padding-bottom:20px;margin-bottom:40px}\
.brand h1{margin:0;color:#2563eb;font-size:24px;text-transform:uppercase}\
.grid{display:flex;gap:40px;margin-bottom:40px}.col{flex:1}\
.label{font-size:10px;font-weight:bold;color:#9ca3af;text-transform:uppercase}\
table{width:100%;border-collapse:collapse;margin-bottom:40px}\
th{text-align:left;padding:12px;background:#f3f4f6;font-size:11px;text-transform:uppercase}\
td{padding:15px 12px;border-bottom:1px solid #e5e7eb;font-weight:bold}\
.total td{background:#1f2937;color:#fff;font-size:18px}\
.paid{color:#16a34a}.unpaid{color:#dc2626}\
.meter{width:100%;max-height:500px;object-fit:contain}";

/// Statement renderer producing HTML
#[derive(Debug, Clone, Default)]
pub struct HtmlStatementRenderer;

impl HtmlStatementRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Renders the statement document
    pub fn render_html(&self, view: &BillView) -> String {
        let bill = &view.bill;
        let owner_name = view.owner.as_ref().map_or("House Owner", |o| o.name.as_str());
        let owner_mobile = view.owner.as_ref().map_or("N/A", |o| o.mobile.as_str());
        let tenant_name = view.tenant.as_ref().map_or("Tenant", |t| t.name.as_str());
        let tenant_mobile = view
            .tenant
            .as_ref()
            .and_then(|t| t.mobile.as_deref())
            .unwrap_or("N/A");
        let status_class = if bill.is_paid() { "paid" } else { "unpaid" };

        let mut html = String::with_capacity(4096);
        // Writing to a String cannot fail.
        let _ = write!(
            html,
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title><style>{STYLES}</style></head><body>\
             <div class=\"header\"><div class=\"brand\"><h1>MeterProof</h1><p>ELECTRICITY BILLING STATEMENT</p></div>\
             <div><h2>INVOICE</h2><p>#{number}</p><p class=\"{status_class}\">{status}</p><p>Issued {issued}</p></div></div>\
             <div class=\"grid\">\
             <div class=\"col\"><div class=\"label\">From (owner)</div><div>{owner_name}</div><div>Mo: {owner_mobile}</div></div>\
             <div class=\"col\"><div class=\"label\">To (tenant)</div><div>{tenant_name}</div><div>Mo: {tenant_mobile}</div></div>\
             </div>\
             <table><tr><th>Billing month</th><th>Previous</th><th>Current</th><th>Units</th><th>Rate</th></tr>\
             <tr><td>{month}</td><td>{previous}</td><td>{current}</td><td>{units}</td><td>{rate}</td></tr>\
             <tr class=\"total\"><td colspan=\"4\">Total amount</td><td>{amount}</td></tr></table>",
            title = escape(&bill.statement_file_name("html")),
            number = escape(&bill.statement_number()),
            status = bill.status,
            issued = format_date(bill.created_at),
            owner_name = escape(owner_name),
            owner_mobile = escape(owner_mobile),
            tenant_name = escape(tenant_name),
            tenant_mobile = escape(tenant_mobile),
            month = bill.month,
            previous = bill.previous_reading,
            current = bill.current_reading,
            units = bill.units,
            rate = Money::inr(bill.unit_rate),
            amount = escape(&format!("₹{}", bill.amount_money().to_fixed())),
        );

        html.push_str("<h3>Meter proof</h3>");
        if let Some(url) = &bill.previous_photo_url {
            let _ = write!(
                html,
                "<p>Previous reading ({})</p><img class=\"meter\" src=\"{}\" alt=\"previous meter\">",
                bill.previous_reading,
                escape(url)
            );
        }
        let _ = write!(
            html,
            "<p>Current reading ({})</p><img class=\"meter\" src=\"{}\" alt=\"current meter\">",
            bill.current_reading,
            escape(&bill.current_photo_url)
        );

        if let Some(link) = &view.upi_link {
            let _ = write!(html, "<p><a href=\"{}\">Pay with UPI</a></p>", escape(link));
        }
        html.push_str("</body></html>");
        html
    }
}

#[async_trait]
impl StatementRenderer for HtmlStatementRenderer {
    #[instrument(skip(self, view), fields(bill_id = %view.bill.id))]
    async fn render(&self, view: &BillView) -> Result<Statement, PortError> {
        Ok(Statement {
            file_name: view.bill.statement_file_name("html"),
            content_type: "text/html; charset=utf-8".to_string(),
            bytes: self.render_html(view).into_bytes(),
        })
    }
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%-d %b %Y").to_string()
}

/// Escapes text for HTML content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
