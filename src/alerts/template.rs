//! Notification message rendering
//!
//! One handlebars template per [`NotificationKind`], compiled once at startup.
//! Output is Telegram-flavoured HTML; substituted values are HTML-escaped.

use handlebars::Handlebars;
use serde_json::json;
use thiserror::Error;

use super::{Alert, NotificationKind};

const NEW_TEMPLATE: &str = include_str!("templates/new.hbs");
const REMINDER_TEMPLATE: &str = include_str!("templates/reminder.hbs");
const RESOLVED_TEMPLATE: &str = include_str!("templates/resolved.hbs");
const INACTIVE_TEMPLATE: &str = include_str!("templates/inactive.hbs");

/// Alert details shared by every kind, available to templates as `{{> details}}`
const DETAILS_PARTIAL: &str = include_str!("templates/details.hbs");

/// Severity shown when the alert has no `severity` label
pub const UNKNOWN_SEVERITY: &str = "unknown";

/// Errors from template compilation or rendering
#[derive(Error, Debug)]
pub enum TemplateError {
    /// A template failed to compile; fatal at startup
    #[error("invalid template '{name}': {source}")]
    Compile {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    /// No template registered for a notification kind
    #[error("no template for notification kind '{0}'")]
    Missing(NotificationKind),

    /// Rendering failed for a specific alert
    #[error("failed to render '{kind}' for alert {alert_id}: {source}")]
    Render {
        kind: NotificationKind,
        alert_id: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },
}

/// Renders alert notifications from the built-in templates
#[derive(Debug, Clone)]
pub struct MessageRenderer {
    registry: Handlebars<'static>,
}

impl MessageRenderer {
    /// Compile the built-in templates
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Compile` if a built-in template is broken
    pub fn new() -> Result<Self, TemplateError> {
        Self::from_templates([
            (NotificationKind::New, NEW_TEMPLATE),
            (NotificationKind::Reminder, REMINDER_TEMPLATE),
            (NotificationKind::Resolved, RESOLVED_TEMPLATE),
            (NotificationKind::Inactive, INACTIVE_TEMPLATE),
        ])
    }

    /// Compile a custom template set; every kind must be present
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Compile` for a template that does not parse and
    /// `TemplateError::Missing` when a kind has no template
    pub fn from_templates<'a, I>(templates: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (NotificationKind, &'a str)>,
    {
        let mut registry = Handlebars::new();
        registry
            .register_partial("details", DETAILS_PARTIAL)
            .map_err(|e| TemplateError::Compile {
                name: "details".to_string(),
                source: Box::new(e),
            })?;

        for (kind, source) in templates {
            registry
                .register_template_string(kind.as_str(), source)
                .map_err(|e| TemplateError::Compile {
                    name: kind.as_str().to_string(),
                    source: Box::new(e),
                })?;
        }

        if let Some(kind) = NotificationKind::ALL
            .into_iter()
            .find(|kind| !registry.has_template(kind.as_str()))
        {
            return Err(TemplateError::Missing(kind));
        }

        Ok(Self { registry })
    }

    /// Render the message for `alert` using the `kind` template
    ///
    /// # Errors
    ///
    /// Returns `TemplateError::Render` if the template cannot be rendered
    pub fn render(&self, alert: &Alert, kind: NotificationKind) -> Result<String, TemplateError> {
        let context = json!({
            "alert": alert,
            "title": alert.title(),
            "severity": alert.severity().unwrap_or(UNKNOWN_SEVERITY),
            "active_at": alert
                .active_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        });

        self.registry
            .render(kind.as_str(), &context)
            .map_err(|e| TemplateError::Render {
                kind,
                alert_id: alert.id.clone(),
                source: Box::new(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(severity: Option<&str>) -> Alert {
        let mut alert = Alert {
            id: "id-42".to_string(),
            name: "alert name".to_string(),
            group_id: "grp".to_string(),
            expression: "a == b".to_string(),
            state: "firing".to_string(),
            value: "43".to_string(),
            active_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).single(),
            ..Default::default()
        };
        alert.labels.insert("host".to_string(), "nas".to_string());
        if let Some(severity) = severity {
            alert.labels.insert("severity".to_string(), severity.to_string());
        }
        alert.annotations.summary = "summary".to_string();
        alert.annotations.description = "description".to_string();
        alert
    }

    #[test]
    fn test_all_kinds_render() {
        let renderer = MessageRenderer::new().unwrap();

        for kind in NotificationKind::ALL {
            let with = renderer.render(&sample(Some("critical")), kind).unwrap();
            assert!(with.contains("<b>summary</b>"), "{kind}: {with}");
            assert!(with.contains("name: alert name"), "{kind}: {with}");
            assert!(with.contains("severity: <b>critical</b>"), "{kind}: {with}");
            assert!(with.contains("\ndescription\n"), "{kind}: {with}");
            assert!(with.contains("host: nas"), "{kind}: {with}");
            assert!(with.contains("2024-05-01 10:00:00 UTC"), "{kind}: {with}");
            assert!(with.trim_end().ends_with("id:id-42"), "{kind}: {with}");

            let mut bare = sample(None);
            bare.annotations = Default::default();
            let without = renderer.render(&bare, kind).unwrap();
            assert!(without.contains("<b>alert name</b>"), "{kind}: {without}");
            assert!(!without.contains("name: "), "{kind}: {without}");
            assert!(without.contains(UNKNOWN_SEVERITY), "{kind}: {without}");
        }
    }

    #[test]
    fn test_kinds_differ_only_in_header() {
        let renderer = MessageRenderer::new().unwrap();
        let alert = sample(Some("warning"));

        let new = renderer.render(&alert, NotificationKind::New).unwrap();
        let resolved = renderer.render(&alert, NotificationKind::Resolved).unwrap();

        assert!(new.starts_with("🔥 "));
        assert!(resolved.starts_with("✅ resolved: "));
        assert_eq!(new.split_once('\n').unwrap().1, resolved.split_once('\n').unwrap().1);
    }

    #[test]
    fn test_values_are_html_escaped() {
        let renderer = MessageRenderer::new().unwrap();
        let mut alert = sample(Some("critical"));
        alert.annotations.summary = "<script>".to_string();

        let message = renderer.render(&alert, NotificationKind::New).unwrap();
        assert!(message.contains("&lt;script&gt;"));
        assert!(!message.contains("<script>"));
    }

    #[test]
    fn test_compile_error_is_reported() {
        let result = MessageRenderer::from_templates([
            (NotificationKind::New, "{{#if alert.id}}unclosed"),
            (NotificationKind::Reminder, ""),
            (NotificationKind::Resolved, ""),
            (NotificationKind::Inactive, ""),
        ]);

        assert!(matches!(result, Err(TemplateError::Compile { .. })));
    }

    #[test]
    fn test_missing_kind_is_reported() {
        let result = MessageRenderer::from_templates([(NotificationKind::New, "x")]);
        assert!(matches!(
            result,
            Err(TemplateError::Missing(NotificationKind::Reminder))
        ));
    }

    #[test]
    fn test_render_error_is_reported() {
        let renderer = MessageRenderer::from_templates([
            (NotificationKind::New, "{{no_such_helper alert.id}}"),
            (NotificationKind::Reminder, "r"),
            (NotificationKind::Resolved, "g"),
            (NotificationKind::Inactive, "i"),
        ])
        .unwrap();

        let result = renderer.render(&sample(None), NotificationKind::New);
        assert!(matches!(result, Err(TemplateError::Render { .. })));
        assert_eq!(
            renderer.render(&sample(None), NotificationKind::Resolved).unwrap(),
            "g"
        );
    }
}
