//! Normalization of raw plan replies.
//!
//! Runs on the untyped JSON before decoding and repairs only what can be
//! repaired without guessing: whitespace, effort and axis synonyms, missing
//! indices and ids, and the domain block. Every repair is recorded as a
//! [`MappingDiagnostic`]. Counts are never touched; a plan with the wrong
//! number of missions stays wrong and is rejected by validation.

use serde::Serialize;
use serde_json::{Map, Value};

use playbook::{Axis, DomainLock, EffortType};

/// A repair applied during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingDiagnostic {
    /// Location, e.g. `path.levels[0].steps[2].axis`
    pub location: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
}

struct Normalizer {
    diagnostics: Vec<MappingDiagnostic>,
}

impl Normalizer {
    fn note(&mut self, location: String, code: &'static str, from: Option<String>, to: impl Into<String>) {
        self.diagnostics.push(MappingDiagnostic {
            location,
            code,
            from,
            to: to.into(),
        });
    }

    fn effort(&mut self, obj: &mut Map<String, Value>, location: &str) -> Option<EffortType> {
        let raw = obj.get("effort_type")?.as_str()?.to_string();
        let mapped = effort_synonym(&raw)?;
        if mapped.as_str() != raw {
            self.note(
                format!("{}.effort_type", location),
                "effort_type_remapped",
                Some(raw),
                mapped.as_str(),
            );
            obj.insert("effort_type".into(), Value::String(mapped.as_str().into()));
        }
        Some(mapped)
    }

    fn axis(&mut self, obj: &mut Map<String, Value>, location: &str, effort: Option<EffortType>) {
        let raw = obj.get("axis").and_then(Value::as_str).map(str::to_string);
        if let Some(axis) = raw.as_deref().and_then(axis_synonym) {
            if Some(axis.as_str()) != raw.as_deref() {
                self.note(format!("{}.axis", location), "axis_remapped", raw, axis.as_str());
                obj.insert("axis".into(), Value::String(axis.as_str().into()));
            }
            return;
        }
        if let Some(effort) = effort {
            let axis = effort.default_axis();
            self.note(
                format!("{}.axis", location),
                "axis_from_effort_type",
                raw,
                axis.as_str(),
            );
            obj.insert("axis".into(), Value::String(axis.as_str().into()));
        }
    }

    fn minutes(&mut self, obj: &mut Map<String, Value>, key: &str, location: &str) {
        let Some(raw) = obj.get(key).and_then(Value::as_str).map(str::to_string) else {
            return;
        };
        if let Ok(minutes) = raw.trim_end_matches("min").trim().parse::<u32>() {
            self.note(format!("{}.{}", location, key), "number_coerced", Some(raw), minutes.to_string());
            obj.insert(key.into(), Value::from(minutes));
        }
    }

    fn backfill_index(&mut self, obj: &mut Map<String, Value>, location: &str, index: usize) {
        if !obj.get("index").is_some_and(Value::is_u64) {
            let from = obj.get("index").map(Value::to_string);
            self.note(format!("{}.index", location), "index_backfilled", from, index.to_string());
            obj.insert("index".into(), Value::from(index as u64));
        }
    }

    fn backfill_id(&mut self, obj: &mut Map<String, Value>, location: &str, id: String) {
        let present = obj
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());
        if !present {
            self.note(format!("{}.id", location), "id_backfilled", None, id.clone());
            obj.insert("id".into(), Value::String(id));
        }
    }

    fn step(&mut self, step: &mut Value, level_pos: usize, step_pos: usize) {
        let Some(obj) = step.as_object_mut() else {
            return;
        };
        let location = format!("path.levels[{}].steps[{}]", level_pos, step_pos);
        self.backfill_id(obj, &location, format!("s{}-{}", level_pos + 1, step_pos + 1));
        self.backfill_index(obj, &location, step_pos + 1);
        let effort = self.effort(obj, &location);
        self.axis(obj, &location, effort);
        self.minutes(obj, "duration_minutes", &location);
    }

    fn path(&mut self, path: &mut Map<String, Value>, lock: &DomainLock) {
        let locked = serde_json::to_value(lock).unwrap_or(Value::Null);
        let current = path.get("domain").cloned();
        if current.as_ref() != Some(&locked) {
            let from = current.map(|v| v.to_string());
            self.note("path.domain".into(), "domain_overwritten", from, lock.domain_id.clone());
            path.insert("domain".into(), locked);
        }

        if !path.get("id").and_then(Value::as_str).is_some_and(|s| !s.is_empty()) {
            let id = uuid::Uuid::new_v4().to_string();
            self.note("path.id".into(), "id_backfilled", None, id.clone());
            path.insert("id".into(), Value::String(id));
        }

        if let Some(Value::Array(levels)) = path.get_mut("levels") {
            for (level_pos, level) in levels.iter_mut().enumerate() {
                let Some(obj) = level.as_object_mut() else {
                    continue;
                };
                let location = format!("path.levels[{}]", level_pos);
                self.backfill_id(obj, &location, format!("l{}", level_pos + 1));
                self.backfill_index(obj, &location, level_pos + 1);
                if let Some(Value::Array(steps)) = obj.get_mut("steps") {
                    for (step_pos, step) in steps.iter_mut().enumerate() {
                        self.step(step, level_pos, step_pos);
                    }
                }
            }
        }
    }

    fn missions(&mut self, missions: &mut [Value]) {
        for (pos, mission) in missions.iter_mut().enumerate() {
            let Some(obj) = mission.as_object_mut() else {
                continue;
            };
            let location = format!("missions[{}]", pos);
            self.effort(obj, &location);
            self.minutes(obj, "estimated_minutes", &location);
        }
    }
}

/// Normalize a raw plan reply.
pub fn normalize(raw: Value, lock: &DomainLock) -> (Value, Vec<MappingDiagnostic>) {
    let mut value = trim_strings(raw);
    let mut normalizer = Normalizer {
        diagnostics: Vec::new(),
    };

    if let Some(root) = value.as_object_mut() {
        if let Some(Value::Object(path)) = root.get_mut("path") {
            normalizer.path(path, lock);
        }
        if let Some(Value::Array(missions)) = root.get_mut("missions") {
            normalizer.missions(missions);
        }
    }

    (value, normalizer.diagnostics)
}

fn trim_strings(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        Value::Array(items) => Value::Array(items.into_iter().map(trim_strings).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, trim_strings(v))).collect()),
        other => other,
    }
}

fn effort_synonym(raw: &str) -> Option<EffortType> {
    let lowered = raw.trim().to_lowercase();
    if let Some(effort) = EffortType::parse(&lowered) {
        return Some(effort);
    }
    let mapped = match lowered.as_str() {
        "reading" | "study" | "lire" | "lecture" => EffortType::Read,
        "video" | "watching" | "regarder" => EffortType::Watch,
        "listening" | "audio" | "podcast" | "ecouter" | "écouter" => EffortType::Listen,
        "exercise" | "exercises" | "drill" | "drills" | "training" | "pratiquer" => EffortType::Practice,
        "write" | "writing" | "build" | "make" | "creer" | "créer" => EffortType::Create,
        "journal" | "journaling" | "review" | "reflection" => EffortType::Reflect,
        "observation" | "notice" | "observer" => EffortType::Observe,
        "movement" | "physical" | "workout" | "sport" | "bouger" => EffortType::Move,
        _ => return None,
    };
    Some(mapped)
}

fn axis_synonym(raw: &str) -> Option<Axis> {
    let lowered = raw.trim().to_lowercase();
    if let Some(axis) = Axis::parse(&lowered) {
        return Some(axis);
    }
    let mapped = match lowered.as_str() {
        "knowledge" | "learn" | "comprendre" | "theory" => Axis::Understand,
        "practice" | "apply" | "action" | "faire" => Axis::Do,
        "perception" | "sense" | "percevoir" => Axis::Perceive,
        "review" | "reflect" | "consolider" | "retention" => Axis::Consolidate,
        _ => return None,
    };
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lock() -> DomainLock {
        DomainLock {
            domain_id: "language".into(),
            domain_profile_label: "Language learning".into(),
            domain_version: "1.2.0".into(),
        }
    }

    #[test]
    fn test_repairs_are_recorded() {
        let raw = json!({
            "path": {
                "title": "  Spanish words  ",
                "domain": {"domain_id": "travel"},
                "levels": [{
                    "title": "Start",
                    "steps": [{
                        "title": "Flashcards",
                        "effort_type": "Exercises",
                        "duration_minutes": "7 min",
                        "mission_id": "m1-1"
                    }]
                }]
            },
            "missions": [{"id": "m1-1", "effort_type": "reading"}]
        });

        let (value, diagnostics) = normalize(raw, &lock());
        let step = &value["path"]["levels"][0]["steps"][0];

        assert_eq!(value["path"]["title"], "Spanish words");
        assert_eq!(value["path"]["domain"]["domain_id"], "language");
        assert_eq!(value["path"]["levels"][0]["id"], "l1");
        assert_eq!(step["id"], "s1-1");
        assert_eq!(step["index"], 1);
        assert_eq!(step["effort_type"], "practice");
        assert_eq!(step["axis"], "do");
        assert_eq!(step["duration_minutes"], 7);
        assert_eq!(value["missions"][0]["effort_type"], "read");

        let codes: Vec<&str> = diagnostics.iter().map(|d| d.code).collect();
        for code in [
            "domain_overwritten",
            "id_backfilled",
            "index_backfilled",
            "effort_type_remapped",
            "axis_from_effort_type",
            "number_coerced",
        ] {
            assert!(codes.contains(&code), "missing {code}");
        }
    }

    #[test]
    fn test_clean_plan_has_no_diagnostics() {
        let raw = json!({
            "path": {
                "id": "p1",
                "domain": serde_json::to_value(lock()).unwrap(),
                "levels": [{"id": "l1", "index": 1, "steps": [{
                    "id": "s1-1", "index": 1, "effort_type": "read", "axis": "understand"
                }]}]
            },
            "missions": []
        });
        let (_, diagnostics) = normalize(raw, &lock());
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_mission_count_is_not_repaired() {
        let raw = json!({
            "path": {"levels": [{"steps": [{"mission_id": "m1"}, {"mission_id": "m2"}]}]},
            "missions": [{"id": "m1"}]
        });
        let (value, _) = normalize(raw, &lock());
        assert_eq!(value["missions"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_axis_synonym() {
        let raw = json!({"path": {"levels": [{"steps": [{"axis": "Review", "effort_type": "read"}]}]}});
        let (value, diagnostics) = normalize(raw, &lock());
        assert_eq!(value["path"]["levels"][0]["steps"][0]["axis"], "consolidate");
        assert!(diagnostics.iter().any(|d| d.code == "axis_remapped"));
    }
}
