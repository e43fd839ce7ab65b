//! Alert message templates
//!
//! Rendered with minijinja. The HTML template is registered under a `.html`
//! name so its output is auto-escaped.

use minijinja::Environment;
use serde::Serialize;

use super::NotifyError;
use crate::anomaly::format_anomaly_name;
use crate::types::{AnomalyReport, Parameter, PlantSnapshot, Severity};

const ALERT_TEXT: &str = r#"CEMENT PLANT ANOMALY ALERT
==================================================

Severity: {{ severity | upper }}
Anomalies Detected: {{ anomalies | length }}

{% for a in anomalies %}  - {{ a | anomaly_name }}
{% endfor %}
Current Plant State:
{% for row in state %}  - {{ row.label }}: {{ row.value }}{% if row.unit %} {{ row.unit }}{% endif %}
{% endfor %}
Action Required:
{% if critical %}IMMEDIATE ATTENTION REQUIRED - Critical anomalies detected!{% else %}Please review and monitor the situation.{% endif %}

This is an automated alert from the plant monitoring system.
{% if frontend_url %}Open the dashboard for detailed analysis and recommendations: {{ frontend_url }}
{% endif %}"#;

const ALERT_HTML: &str = r#"<html>
  <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="background-color: {{ accent }}; color: white; padding: 20px; text-align: center;">
      <h1>{{ severity | upper }}: Cement Plant Anomaly Detected</h1>
    </div>
    <div style="padding: 20px;">
      <p><strong>Severity:</strong> <span style="color: {{ accent }};">{{ severity | upper }}</span></p>
      <p><strong>Anomalies Detected:</strong> {{ anomalies | length }}</p>
      <div style="background-color: #f3f4f6; padding: 15px; border-left: 4px solid {{ accent }};">
        <h3>Detected Anomalies:</h3>
        <ul>{% for a in anomalies %}<li>{{ a | anomaly_name }}</li>{% endfor %}</ul>
      </div>
      <h3>Current Plant State:</h3>
      <table style="width: 100%; border-collapse: collapse;">
        {% for row in state %}<tr><td><strong>{{ row.label }}</strong></td><td>{{ row.value }}{% if row.unit %} {{ row.unit }}{% endif %}</td></tr>
        {% endfor %}
      </table>
      <p>{% if critical %}<strong>IMMEDIATE ATTENTION REQUIRED</strong> - Critical anomalies detected in the production system!{% else %}Please review and monitor the situation closely.{% endif %}</p>
      {% if frontend_url %}<p>Open the <a href="{{ frontend_url }}">dashboard</a> for detailed analysis and recommendations.</p>{% endif %}
    </div>
  </body>
</html>
"#;

const TEST_TEXT: &str = r#"This is a test email from the plant monitoring system.

If you received this email, your email configuration is working correctly.

Email alerts will be sent for:
- Critical anomalies (to admins and operators)
- Warning anomalies (to operators)
"#;

#[derive(Serialize)]
struct StateRow {
    label: &'static str,
    value: String,
    unit: &'static str,
}

#[derive(Serialize)]
struct AlertContext<'a> {
    severity: &'static str,
    critical: bool,
    accent: &'static str,
    anomalies: Vec<&'static str>,
    state: Vec<StateRow>,
    frontend_url: Option<&'a str>,
}

/// Subject line for an alert of the given severity.
pub fn alert_subject(severity: Severity) -> String {
    format!(
        "{}: Cement Plant Anomaly Detected",
        severity.as_str().to_ascii_uppercase()
    )
}

pub const TEST_SUBJECT: &str = "Plant Monitoring - Email Configuration Test";

/// Renders alert bodies. Templates are compiled once at construction.
pub struct AlertRenderer {
    env: Environment<'static>,
}

impl AlertRenderer {
    pub fn new() -> Result<Self, NotifyError> {
        let mut env = Environment::new();
        env.add_filter("anomaly_name", |s: String| format_anomaly_name(&s));
        env.add_template("alert.txt", ALERT_TEXT)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        env.add_template("alert.html", ALERT_HTML)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        env.add_template("test.txt", TEST_TEXT)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(Self { env })
    }

    /// Plain-text and HTML bodies for an alert.
    pub fn render_alert(
        &self,
        report: &AnomalyReport,
        snapshot: &PlantSnapshot,
        frontend_url: Option<&str>,
    ) -> Result<(String, String), NotifyError> {
        let critical = report.severity() == Severity::Critical;
        let ctx = AlertContext {
            severity: report.severity().as_str(),
            critical,
            accent: if critical { "#dc2626" } else { "#f59e0b" },
            anomalies: report.anomalies().iter().map(|t| t.as_str()).collect(),
            state: Parameter::ALL
                .iter()
                .map(|&p| StateRow {
                    label: p.label(),
                    value: snapshot
                        .monitored(p)
                        .map_or_else(|| "N/A".to_string(), |v| v.to_string()),
                    unit: p.unit(),
                })
                .collect(),
            frontend_url,
        };

        let text = self.render("alert.txt", &ctx)?;
        let html = self.render("alert.html", &ctx)?;
        Ok((text, html))
    }

    pub fn render_test(&self) -> Result<String, NotifyError> {
        self.render("test.txt", &())
    }

    fn render<S: Serialize>(&self, name: &str, ctx: &S) -> Result<String, NotifyError> {
        self.env
            .get_template(name)
            .and_then(|t| t.render(ctx))
            .map_err(|e| NotifyError::Template(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnomalyTag;

    fn report() -> AnomalyReport {
        AnomalyReport::from_tiers(
            vec![AnomalyTag::HighKilnTemp],
            vec![AnomalyTag::ElevatedEnergyConsumption],
        )
    }

    fn snapshot() -> PlantSnapshot {
        PlantSnapshot {
            kiln_temp: Some(1512.5),
            energy_use: Some(165.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_subject_uses_upper_severity() {
        assert_eq!(
            alert_subject(Severity::Critical),
            "CRITICAL: Cement Plant Anomaly Detected"
        );
        assert_eq!(
            alert_subject(Severity::Warning),
            "WARNING: Cement Plant Anomaly Detected"
        );
    }

    #[test]
    fn test_text_body_lists_anomalies_critical_first() {
        let r = AlertRenderer::new().unwrap();
        let (text, _) = r.render_alert(&report(), &snapshot(), None).unwrap();

        let kiln = text.find("High Kiln Temp").unwrap();
        let energy = text.find("Elevated Energy Consumption").unwrap();
        assert!(kiln < energy);
        assert!(text.contains("Severity: CRITICAL"));
        assert!(text.contains("Anomalies Detected: 2"));
        assert!(text.contains("Kiln Temperature: 1512.5 °C"));
        assert!(text.contains("Feed Rate: N/A"));
        assert!(text.contains("IMMEDIATE ATTENTION REQUIRED"));
    }

    #[test]
    fn test_html_body_escapes_and_links() {
        let r = AlertRenderer::new().unwrap();
        let (_, html) = r
            .render_alert(&report(), &snapshot(), Some("https://ops.example/?a=1&b=2"))
            .unwrap();
        assert!(html.contains("#dc2626"));
        assert!(html.contains("<li>High Kiln Temp</li>"));
        assert!(html.contains("a=1&amp;b=2"));
    }

    #[test]
    fn test_warning_body_asks_for_review() {
        let r = AlertRenderer::new().unwrap();
        let warn = AnomalyReport::from_tiers(vec![], vec![AnomalyTag::LowFanSpeed]);
        let (text, html) = r.render_alert(&warn, &snapshot(), None).unwrap();
        assert!(text.contains("Please review and monitor the situation."));
        assert!(html.contains("#f59e0b"));
    }

    #[test]
    fn test_render_test_message() {
        let r = AlertRenderer::new().unwrap();
        assert!(r.render_test().unwrap().contains("configuration is working"));
    }
}
