//! Server-side HTML for the dashboard views

use crate::batch::{BatchReport, BucketCounts};
use crate::types::customer::{
    CustomerSignals, MONTHLY_CHARGES_RANGE, SERVICE_COMPLEXITY_RANGE, TENURE_RANGE,
};
use crate::types::prediction::{SingleAssessment, Verdict};
use crate::web::charts::{bucket_color, css_color};
use std::fmt::Write;

const STYLE: &str = r#"
body { background: #0B0B12; color: #E5E7EB; font-family: system-ui, sans-serif; margin: 0 auto; max-width: 1200px; padding: 0 24px 48px; }
.hero { padding: 30px 0 20px 0; text-align: center; }
.hero-title { font-size: 64px; font-weight: 800; background: linear-gradient(90deg, #8B5CF6, #22D3EE); -webkit-background-clip: text; -webkit-text-fill-color: transparent; }
.hero-sub { font-size: 20px; color: #9CA3AF; margin-top: 12px; }
.tabs { display: flex; gap: 12px; border-bottom: 1px solid #27273A; margin-bottom: 24px; }
.tabs a { color: #9CA3AF; padding: 10px 16px; text-decoration: none; }
.tabs a.active { color: #E5E7EB; border-bottom: 2px solid #8B5CF6; }
.columns { display: grid; grid-template-columns: 1.1fr 1fr; gap: 24px; }
.card { background: linear-gradient(145deg, #14141F, #0F0F18); padding: 28px; border-radius: 22px; box-shadow: 0 0 40px rgba(139,92,246,0.18); margin-bottom: 24px; }
label { display: block; margin: 14px 0 6px; }
input[type=range] { width: 100%; }
.toggles { display: grid; grid-template-columns: 1fr 1fr; }
button { width: 100%; margin-top: 20px; padding: 12px; border: 0; border-radius: 12px; background: #8B5CF6; color: white; font-size: 16px; cursor: pointer; }
.gauge { text-align: center; }
.gauge-value { font-size: 42px; font-weight: 700; margin-top: -40px; }
.notice { padding: 14px 18px; border-radius: 12px; margin: 16px 0; }
.error { background: rgba(239,68,68,0.15); color: #FCA5A5; }
.success { background: rgba(34,197,94,0.15); color: #86EFAC; }
table { border-collapse: collapse; width: 100%; font-size: 13px; overflow-x: auto; display: block; }
th, td { padding: 6px 10px; border-bottom: 1px solid #27273A; text-align: left; white-space: nowrap; }
.legend span { display: inline-block; width: 12px; height: 12px; border-radius: 3px; margin-right: 6px; }
.download { display: inline-block; margin-top: 12px; color: #22D3EE; }
"#;

/// Which dashboard tab is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Single,
    Batch,
}

/// Outcome of the single-customer form
pub enum SingleOutcome {
    /// Form not yet submitted
    Pending,
    Scored {
        assessment: SingleAssessment,
        gauge_svg: String,
    },
    Failed(String),
}

/// Outcome of a batch upload
pub enum BatchOutcome<'a> {
    /// Nothing uploaded yet
    Waiting,
    Failed(String),
    Scored {
        report: &'a BatchReport,
        preview_rows: usize,
        pie_svg: String,
        download_href: String,
        download_filename: &'a str,
    },
}

/// Raw rows of an upload shown before validation
pub struct UploadPreview<'a> {
    pub headers: &'a [String],
    pub rows: Vec<Vec<String>>,
}

/// Escape text for HTML element and attribute content
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

fn layout(view: View, body: &str) -> String {
    let tab = |target: View, href: &str, label: &str| {
        let class = if target == view { " class=\"active\"" } else { "" };
        format!("<a href=\"{}\"{}>{}</a>", href, class, label)
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>ChurnIQ</title>\n<style>{style}</style>\n</head>\n<body>\n\
         <div class=\"hero\"><div class=\"hero-title\">ChurnIQ</div>\
         <div class=\"hero-sub\">AI-powered behavioral intelligence to predict customer churn<br>\
         <b>before it happens</b></div></div>\n\
         <nav class=\"tabs\">{single}{batch}</nav>\n{body}\n</body>\n</html>\n",
        style = STYLE,
        single = tab(View::Single, "/", "Single Customer"),
        batch = tab(View::Batch, "/?view=batch", "Batch Customers"),
        body = body,
    )
}

/// Single-customer tab: signal form on the left, result on the right
pub fn single_page(signals: &CustomerSignals, outcome: &SingleOutcome) -> String {
    let slider = |name: &str, label: &str, value: u32, min: u32, max: u32| {
        format!(
            "<label for=\"{name}\">{label}: <output id=\"{name}_out\">{value}</output></label>\
             <input type=\"range\" id=\"{name}\" name=\"{name}\" min=\"{min}\" max=\"{max}\" \
             value=\"{value}\" oninput=\"{name}_out.value=this.value\">",
        )
    };
    let toggle = |name: &str, label: &str, checked: bool| {
        format!(
            "<label><input type=\"checkbox\" name=\"{}\"{}> {}</label>",
            name,
            if checked { " checked" } else { "" },
            label
        )
    };

    let form = format!(
        "<div class=\"card\"><h3>Customer Signals</h3>\
         <form method=\"post\" action=\"/single\">{tenure}{charges}\
         <div class=\"toggles\"><div>{m2m}{fiber}</div><div>{support}{manual}</div></div>\
         {complexity}<button type=\"submit\">Analyze churn risk</button></form></div>",
        tenure = slider(
            "tenure",
            "Tenure (months)",
            signals.tenure,
            *TENURE_RANGE.start(),
            *TENURE_RANGE.end()
        ),
        charges = slider(
            "monthly_charges",
            "Monthly Charges ($)",
            signals.monthly_charges,
            *MONTHLY_CHARGES_RANGE.start(),
            *MONTHLY_CHARGES_RANGE.end()
        ),
        m2m = toggle("is_month_to_month", "Month-to-month contract", signals.is_month_to_month),
        fiber = toggle("fiber_internet", "Fiber internet", signals.fiber_internet),
        support = toggle("no_tech_support", "No tech support", signals.no_tech_support),
        manual = toggle("manual_payment", "Manual payment", signals.manual_payment),
        complexity = slider(
            "service_complexity",
            "Service complexity",
            signals.service_complexity,
            *SERVICE_COMPLEXITY_RANGE.start(),
            *SERVICE_COMPLEXITY_RANGE.end()
        ),
    );

    let result = match outcome {
        SingleOutcome::Pending => String::new(),
        SingleOutcome::Failed(message) => format!(
            "<div class=\"card\"><div class=\"notice error\">{}</div></div>",
            escape(message)
        ),
        SingleOutcome::Scored {
            assessment,
            gauge_svg,
        } => {
            let class = match assessment.verdict {
                Verdict::HighRisk => "error",
                Verdict::Stable => "success",
            };
            format!(
                "<div class=\"card\"><h3>Churn Risk Intelligence</h3>\
                 <div class=\"gauge\">{svg}<div class=\"gauge-value\">{value:.1}%</div></div>\
                 <div class=\"notice {class}\">{message}</div></div>",
                svg = gauge_svg,
                value = assessment.gauge_value,
                class = class,
                message = assessment.verdict_message,
            )
        }
    };

    layout(
        View::Single,
        &format!("<div class=\"columns\"><div>{}</div><div>{}</div></div>", form, result),
    )
}

/// Batch tab: uploader, raw preview, then validation error or results
pub fn batch_page(preview: Option<&UploadPreview<'_>>, outcome: &BatchOutcome<'_>) -> String {
    let mut body = String::from(
        "<div class=\"card\"><h3>Batch Churn Prediction</h3>\
         <form method=\"post\" action=\"/batch\" enctype=\"multipart/form-data\">\
         <label for=\"file\">Upload CSV with engineered customer features</label>\
         <input type=\"file\" id=\"file\" name=\"file\" accept=\".csv\">\
         <button type=\"submit\">Score customers</button></form></div>",
    );

    if let Some(preview) = preview {
        body.push_str("<div class=\"card\">");
        body.push_str(&table_html(preview.headers, &preview.rows));
        body.push_str("</div>");
    }

    match outcome {
        BatchOutcome::Waiting => {}
        BatchOutcome::Failed(message) => {
            let _ = write!(
                body,
                "<div class=\"notice error\">{}</div>",
                escape(message)
            );
        }
        BatchOutcome::Scored {
            report,
            preview_rows,
            pie_svg,
            download_href,
            download_filename,
        } => {
            let counts = report.bucket_counts();
            let _ = write!(
                body,
                "<div class=\"notice success\">Batch predictions completed ({} customers)</div>\
                 <div class=\"card\">{table}</div>\
                 <div class=\"card columns\"><div>{pie}</div><div>{legend}\
                 <a class=\"download\" href=\"{href}\" download=\"{file}\">Download predictions</a>\
                 </div></div>",
                report.row_count(),
                table = table_html(&report.headers(), &report.preview(*preview_rows)),
                pie = pie_svg,
                legend = legend_html(&counts),
                href = download_href,
                file = escape(download_filename),
            );
        }
    }

    layout(View::Batch, &body)
}

fn table_html(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table><thead><tr>");
    for h in headers {
        let _ = write!(html, "<th>{}</th>", escape(h));
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape(cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn legend_html(counts: &BucketCounts) -> String {
    let mut html = String::from(
        "<table class=\"legend\"><thead><tr><th>Risk Level</th><th>Customers</th><th>Share</th></tr></thead><tbody>",
    );
    let total = counts.total();
    for (bucket, count) in counts.present() {
        let _ = write!(
            html,
            "<tr><td><span style=\"background:{}\"></span>{}</td><td>{}</td><td>{:.1}%</td></tr>",
            css_color(bucket_color(bucket)),
            bucket.label(),
            count,
            count as f64 / total as f64 * 100.0
        );
    }
    html.push_str("</tbody></table>");
    html
}
