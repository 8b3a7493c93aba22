//! Invoice rendering for payment receipt emails.

use chrono::{DateTime, Utc};

use crate::models::{Plan, Purchase, User};

/// Format a Unix timestamp as a human-readable date (e.g., "Jan 15, 2026")
fn format_date(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| "Unknown date".to_string())
}

/// Everything needed to render a receipt for a settled purchase.
pub struct InvoiceData<'a> {
    pub user: &'a User,
    pub plan: &'a Plan,
    pub purchase: &'a Purchase,
    /// Base URL for the dashboard link embedded in the receipt.
    pub base_url: &'a str,
}

impl InvoiceData<'_> {
    fn invoice_number(&self) -> String {
        // Short, human-quotable reference derived from the ledger row.
        format!("CS-{}", &self.purchase.id[..8.min(self.purchase.id.len())])
    }

    pub fn subject(&self) -> String {
        format!("Payment received for {}", self.plan.title)
    }

    pub fn render_text(&self) -> String {
        let mut lines = format!(
            "Hi {},\n\nThank you for your purchase!\n\nInvoice: {}\nPlan: {}\nAmount: ₹{}\nOrder: {}\nDate: {}\n",
            self.user.name,
            self.invoice_number(),
            self.plan.title,
            self.purchase.amount,
            self.purchase.order_id,
            format_date(self.purchase.settled_at.unwrap_or(self.purchase.created_at)),
        );
        if let Some(ref coupon) = self.purchase.coupon_used {
            lines.push_str(&format!("Coupon applied: {}\n", coupon));
        }
        lines.push_str(&format!(
            "\nYour plan is now active. Get started: {}/dashboard\n",
            self.base_url
        ));
        lines
    }

    pub fn render_html(&self) -> String {
        let coupon_row = match self.purchase.coupon_used {
            Some(ref coupon) => format!(
                r#"<tr><td style="padding: 8px 0; color: #666;">Coupon</td><td style="padding: 8px 0; text-align: right;">{}</td></tr>"#,
                coupon
            ),
            None => String::new(),
        };
        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">Payment received</h2>
<p>Hi {name}, thank you for your purchase! Your plan is now active.</p>
<table style="width: 100%; border-collapse: collapse; margin: 24px 0;">
<tr><td style="padding: 8px 0; color: #666;">Invoice</td><td style="padding: 8px 0; text-align: right;"><strong>{invoice}</strong></td></tr>
<tr><td style="padding: 8px 0; color: #666;">Plan</td><td style="padding: 8px 0; text-align: right;">{plan}</td></tr>
<tr><td style="padding: 8px 0; color: #666;">Amount</td><td style="padding: 8px 0; text-align: right;"><strong>₹{amount}</strong></td></tr>
{coupon_row}
<tr><td style="padding: 8px 0; color: #666;">Order</td><td style="padding: 8px 0; text-align: right;"><code>{order}</code></td></tr>
<tr><td style="padding: 8px 0; color: #666;">Date</td><td style="padding: 8px 0; text-align: right;">{date}</td></tr>
</table>
<p><a href="{base_url}/dashboard" style="color: #2563eb;">Open your dashboard</a> to get started.</p>
<hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
<p style="color: #999; font-size: 12px;">This is an automated receipt. Reply to this email if anything looks wrong.</p>
</body>
</html>"#,
            name = self.user.name,
            invoice = self.invoice_number(),
            plan = self.plan.title,
            amount = self.purchase.amount,
            coupon_row = coupon_row,
            order = self.purchase.order_id,
            date = format_date(self.purchase.settled_at.unwrap_or(self.purchase.created_at)),
            base_url = self.base_url,
        )
    }
}
