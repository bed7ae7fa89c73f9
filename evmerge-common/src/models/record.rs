//! Raw source records and the canonical normalized record

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names each canonical field resolves from, in lookup order.
///
/// The first name is the column used by the published source files, the
/// second is the canonical snake_case name.
pub mod fields {
    pub const YEAR: &[&str] = &["YEAR", "year"];
    pub const MAKE: &[&str] = &["Make", "make"];
    pub const MODEL: &[&str] = &["Model", "model"];
    pub const SIZE: &[&str] = &["Size", "size"];
    pub const TYPE: &[&str] = &["TYPE", "type"];

    pub const KW: &[&str] = &["(kW)", "kw"];
    pub const CITY_KWH: &[&str] = &["CITY (kWh/100 km)", "city_kWh"];
    pub const HWY_KWH: &[&str] = &["HWY (kWh/100 km)", "hwy_kWh"];
    pub const COMB_KWH: &[&str] = &["COMB (kWh/100 km)", "comb_kWh"];
    pub const CITY_LE: &[&str] = &["CITY (Le/100 km)", "city_le"];
    pub const HWY_LE: &[&str] = &["HWY (Le/100 km)", "hwy_le"];
    pub const COMB_LE: &[&str] = &["COMB (Le/100 km)", "comb_le"];
    pub const G_PER_KM: &[&str] = &["(g/km)", "g_per_km"];
    pub const RATING: &[&str] = &["RATING", "rating"];
    pub const KM: &[&str] = &["(km)", "km"];
    pub const TIME_H: &[&str] = &["TIME (h)", "time_h"];
}

/// An unvalidated record in its originating source's field layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First non-null value among `names`
    pub fn lookup(&self, names: &[&str]) -> Option<&Value> {
        names
            .iter()
            .filter_map(|name| self.0.get(*name))
            .find(|value| !value.is_null())
    }

    /// Field coerced to an integer.
    ///
    /// Accepts integers, integral floats and strings holding either.
    pub fn integer(&self, names: &[&str]) -> Option<i64> {
        match self.lookup(names)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
            _ => None,
        }
    }

    /// Field coerced to a finite float
    pub fn number(&self, names: &[&str]) -> Option<f64> {
        let value = match self.lookup(names)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        value.is_finite().then_some(value)
    }

    /// Field coerced to text; numbers render without a trailing `.0`
    pub fn text(&self, names: &[&str]) -> Option<String> {
        match self.lookup(names)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(i.to_string()),
                None => n
                    .as_f64()
                    .map(|f| integral(f).map(|i| i.to_string()).unwrap_or_else(|| f.to_string())),
            },
            _ => None,
        }
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

impl From<Map<String, Value>> for RawRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Canonical, validated vehicle record persisted per task
///
/// Optional fields serialize as `null` when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub year: i64,
    pub make: String,
    pub model: String,
    pub size: String,
    #[serde(rename = "type")]
    pub vehicle_type: String,

    /// Motor power (kW)
    pub kw: Option<f64>,

    #[serde(rename = "city_kWh")]
    pub city_kwh: Option<f64>,
    #[serde(rename = "hwy_kWh")]
    pub hwy_kwh: Option<f64>,
    #[serde(rename = "comb_kWh")]
    pub comb_kwh: Option<f64>,

    /// Litres-equivalent per 100 km
    pub city_le: Option<f64>,
    pub hwy_le: Option<f64>,
    pub comb_le: Option<f64>,

    /// CO2 emissions rate
    pub g_per_km: Option<f64>,
    pub rating: Option<String>,

    /// Range
    pub km: Option<i64>,
    /// Charge time
    pub time_h: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => RawRecord::from(map),
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_lookup_skips_null_and_uses_alias() {
        let r = record(json!({"YEAR": null, "year": 2021}));
        assert_eq!(r.integer(fields::YEAR), Some(2021));
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(record(json!({"YEAR": 2020.0})).integer(fields::YEAR), Some(2020));
        assert_eq!(record(json!({"YEAR": " 2019 "})).integer(fields::YEAR), Some(2019));
        assert_eq!(record(json!({"YEAR": 2020.5})).integer(fields::YEAR), None);
        assert_eq!(record(json!({"YEAR": "new"})).integer(fields::YEAR), None);
        assert_eq!(record(json!({"YEAR": true})).integer(fields::YEAR), None);
    }

    #[test]
    fn test_text_renders_numbers() {
        assert_eq!(record(json!({"RATING": 10})).text(fields::RATING).as_deref(), Some("10"));
        assert_eq!(record(json!({"RATING": 10.0})).text(fields::RATING).as_deref(), Some("10"));
        assert_eq!(record(json!({"RATING": 7.5})).text(fields::RATING).as_deref(), Some("7.5"));
        assert_eq!(record(json!({"RATING": "n/a"})).text(fields::RATING).as_deref(), Some("n/a"));
    }

    #[test]
    fn test_number_from_string() {
        let r = record(json!({"(kW)": "150.5", "(g/km)": "abc"}));
        assert_eq!(r.number(fields::KW), Some(150.5));
        assert_eq!(r.number(fields::G_PER_KM), None);
    }

    #[test]
    fn test_unset_fields_serialize_as_null() {
        let rec = NormalizedRecord {
            year: 2021,
            make: "Tesla".into(),
            model: "Model 3".into(),
            size: "Mid-size".into(),
            vehicle_type: "BEV".into(),
            kw: None,
            city_kwh: Some(15.2),
            hwy_kwh: None,
            comb_kwh: None,
            city_le: None,
            hwy_le: None,
            comb_le: None,
            g_per_km: None,
            rating: None,
            km: Some(423),
            time_h: None,
        };

        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "BEV");
        assert_eq!(json["city_kWh"], 15.2);
        assert!(json.get("kw").is_some_and(Value::is_null));
        assert!(json.get("time_h").is_some_and(Value::is_null));
    }
}
