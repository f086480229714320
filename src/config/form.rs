//! The merchant settings form: which fields exist for a given service catalog
//! and how each submitted value is cleaned before validation.

use crate::domain::model::CatalogService;
use crate::domain::settings::{SettingsSnapshot, DEFAULT_FREE_WORDING, DEFAULT_PASSWORD, DEFAULT_USERNAME};
use std::collections::BTreeMap;

/// Raw values posted by the settings form, keyed by field.
pub type FormSubmission = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Checkbox,
    Decimal,
    Number,
    Select,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub key: String,
    pub kind: FieldKind,
    pub default: String,
    pub options: Vec<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FormField {
    fn new(key: impl Into<String>, kind: FieldKind, default: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            default: default.into(),
            options: Vec::new(),
            min: None,
            max: None,
        }
    }

    fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

pub type Sanitizer = fn(&FormField, &str) -> String;

/// Sanitizers for fields that need more than their type's rule.
const KEY_SANITIZERS: &[(&str, Sanitizer)] = &[
    ("mds_user", sanitize_email),
    ("mds_pass", sanitize_password),
];

const KIND_SANITIZERS: &[(FieldKind, Sanitizer)] = &[
    (FieldKind::Text, sanitize_text),
    (FieldKind::Checkbox, sanitize_checkbox),
    (FieldKind::Decimal, sanitize_decimal),
    (FieldKind::Number, sanitize_number),
    (FieldKind::Select, sanitize_select),
];

/// Picks the sanitizer for a field: by key first, then by kind, then text.
pub fn sanitizer_for(field: &FormField) -> Sanitizer {
    KEY_SANITIZERS
        .iter()
        .find(|(key, _)| *key == field.key)
        .map(|(_, sanitizer)| *sanitizer)
        .or_else(|| {
            KIND_SANITIZERS
                .iter()
                .find(|(kind, _)| *kind == field.kind)
                .map(|(_, sanitizer)| *sanitizer)
        })
        .unwrap_or(sanitize_text)
}

fn sanitize_text(_field: &FormField, value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

fn sanitize_email(field: &FormField, value: &str) -> String {
    sanitize_text(field, value).to_lowercase()
}

fn sanitize_password(_field: &FormField, value: &str) -> String {
    value.trim_matches(|c: char| c == '\r' || c == '\n').to_string()
}

fn sanitize_checkbox(_field: &FormField, value: &str) -> String {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "1" | "on" | "true" => "yes".to_string(),
        _ => "no".to_string(),
    }
}

fn parse_clamped(field: &FormField, value: &str) -> Option<f64> {
    let mut number: f64 = value.trim().parse().ok().filter(|n: &f64| n.is_finite())?;
    if let Some(min) = field.min {
        number = number.max(min);
    }
    if let Some(max) = field.max {
        number = number.min(max);
    }
    Some(number)
}

fn sanitize_decimal(field: &FormField, value: &str) -> String {
    parse_clamped(field, value)
        .map(|n| format!("{:.2}", n))
        .unwrap_or_else(|| field.default.clone())
}

fn sanitize_number(field: &FormField, value: &str) -> String {
    parse_clamped(field, value)
        .map(|n| n.to_string())
        .unwrap_or_else(|| field.default.clone())
}

fn sanitize_select(field: &FormField, value: &str) -> String {
    let value = value.trim();
    if field.options.is_empty() || field.options.iter().any(|o| o == value) {
        value.to_string()
    } else {
        field.default.clone()
    }
}

/// Fields of the settings form. Per-service and free-delivery fields are only
/// present once the courier catalog is known.
pub fn form_fields(catalog: &[CatalogService]) -> Vec<FormField> {
    let mut fields = vec![
        FormField::new("enabled", FieldKind::Checkbox, "yes"),
        FormField::new("mds_user", FieldKind::Text, DEFAULT_USERNAME),
        FormField::new("mds_pass", FieldKind::Text, DEFAULT_PASSWORD),
    ];

    if catalog.is_empty() {
        return fields;
    }

    fields.push(FormField::new("include_product_titles", FieldKind::Checkbox, "no"));
    fields.push(FormField::new("risk_cover", FieldKind::Checkbox, "yes"));
    fields.push(FormField::new("risk_cover_threshold", FieldKind::Decimal, "0.00"));
    fields.push(FormField::new("round", FieldKind::Checkbox, "yes"));

    for service in catalog {
        fields.push(FormField::new(format!("method_{}", service.id), FieldKind::Checkbox, "yes"));
        fields.push(
            FormField::new(format!("markup_{}", service.id), FieldKind::Number, "10")
                .with_range(Some(0.0), None),
        );
        fields.push(FormField::new(
            format!("wording_{}", service.id),
            FieldKind::Text,
            service.title.clone(),
        ));
    }

    let service_ids: Vec<String> = catalog.iter().map(|s| s.id.to_string()).collect();

    fields.push(
        FormField::new("method_free", FieldKind::Select, "no").with_options(["no", "yes", "discount"]),
    );
    fields.push(
        FormField::new("shipping_discount_percentage", FieldKind::Number, "10")
            .with_range(Some(2.0), Some(100.0)),
    );
    fields.push(FormField::new("wording_free", FieldKind::Text, DEFAULT_FREE_WORDING));
    fields.push(
        FormField::new("free_min_total", FieldKind::Number, "1000.00").with_range(Some(0.0), None),
    );
    fields.push(FormField::new("free_local_only", FieldKind::Checkbox, "no"));
    fields.push(
        FormField::new("free_default_service", FieldKind::Select, "5")
            .with_options(service_ids.clone()),
    );
    fields.push(
        FormField::new("free_local_default_service", FieldKind::Select, "2")
            .with_options(service_ids),
    );
    fields.push(FormField::new(
        "toggle_automatic_mds_processing",
        FieldKind::Checkbox,
        "no",
    ));

    fields
}

/// Cleans a submission into a settings snapshot. Fields absent from the
/// submission keep their value from `current`, or the field default.
///
/// This includes checkboxes. An HTML form leaves an unticked box out of the
/// post entirely, so a caller posting browser forms must send `"no"` for
/// every unticked checkbox to switch it off.
pub fn sanitize_form(
    fields: &[FormField],
    submission: &FormSubmission,
    current: &SettingsSnapshot,
) -> SettingsSnapshot {
    let mut snapshot = current.clone();

    for field in fields {
        let value = match submission.get(&field.key) {
            Some(raw) => sanitizer_for(field)(field, raw),
            None => match current.get(&field.key) {
                Some(existing) => existing.clone(),
                None => field.default.clone(),
            },
        };
        snapshot.insert(field.key.clone(), value);
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<CatalogService> {
        vec![
            CatalogService::new(1, "Overnight before 10:00"),
            CatalogService::new(2, "Overnight before 16:00"),
            CatalogService::new(5, "Road Freight"),
        ]
    }

    fn field(fields: &[FormField], key: &str) -> FormField {
        fields.iter().find(|f| f.key == key).cloned().unwrap()
    }

    #[test]
    fn test_key_sanitizer_wins_over_kind() {
        let fields = form_fields(&catalog());
        let user = field(&fields, "mds_user");
        assert_eq!(sanitizer_for(&user)(&user, "  Shop@Example.COM "), "shop@example.com");

        let wording = field(&fields, "wording_1");
        assert_eq!(sanitizer_for(&wording)(&wording, " Express\n"), "Express");
    }

    #[test]
    fn test_numbers_are_clamped() {
        let fields = form_fields(&catalog());
        let discount = field(&fields, "shipping_discount_percentage");
        assert_eq!(sanitizer_for(&discount)(&discount, "150"), "100");
        assert_eq!(sanitizer_for(&discount)(&discount, "abc"), "10");

        let markup = field(&fields, "markup_5");
        assert_eq!(sanitizer_for(&markup)(&markup, "-4"), "0");

        let threshold = field(&fields, "risk_cover_threshold");
        assert_eq!(sanitizer_for(&threshold)(&threshold, "99.5"), "99.50");
    }

    #[test]
    fn test_select_rejects_unknown_option() {
        let fields = form_fields(&catalog());
        let free = field(&fields, "free_default_service");
        assert_eq!(sanitizer_for(&free)(&free, "2"), "2");
        assert_eq!(sanitizer_for(&free)(&free, "42"), "5");
    }

    #[test]
    fn test_without_catalog_only_account_fields() {
        let keys: Vec<String> = form_fields(&[]).into_iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["enabled", "mds_user", "mds_pass"]);
    }

    #[test]
    fn test_sanitize_form_keeps_unsubmitted_values() {
        let fields = form_fields(&catalog());
        let mut current = SettingsSnapshot::new();
        current.insert("round".into(), "no".into());

        let mut submission = FormSubmission::new();
        submission.insert("method_2".into(), "off".into());
        submission.insert("unknown_field".into(), "ignored".into());

        let snapshot = sanitize_form(&fields, &submission, &current);
        assert_eq!(snapshot["method_2"], "no");
        assert_eq!(snapshot["round"], "no");
        assert_eq!(snapshot["method_1"], "yes");
        assert_eq!(snapshot["wording_5"], "Road Freight");
        assert!(!snapshot.contains_key("unknown_field"));
    }

    #[test]
    fn test_checkbox_turns_off_only_when_sent() {
        let fields = form_fields(&catalog());
        let mut current = SettingsSnapshot::new();
        current.insert("risk_cover".into(), "yes".into());
        current.insert("method_5".into(), "yes".into());

        let untouched = sanitize_form(&fields, &FormSubmission::new(), &current);
        assert_eq!(untouched["risk_cover"], "yes");
        assert_eq!(untouched["method_5"], "yes");

        let mut submission = FormSubmission::new();
        submission.insert("risk_cover".into(), "no".into());
        submission.insert("method_5".into(), "".into());

        let unticked = sanitize_form(&fields, &submission, &current);
        assert_eq!(unticked["risk_cover"], "no");
        assert_eq!(unticked["method_5"], "no");
    }
}
