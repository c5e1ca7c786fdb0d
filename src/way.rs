use osmpbf::{Info, Way};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Owned copy of one way, detached from the PBF block it was decoded from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WayRecord {
    pub id: i64,
    pub tags: Vec<(String, String)>,
    pub refs: Vec<i64>,
    pub meta: Option<WayMeta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WayMeta {
    pub version: Option<i64>,
    pub changeset: Option<i64>,
    pub timestamp: Option<String>,
    pub uid: Option<i64>,
    pub user: Option<String>,
}

impl WayRecord {
    pub fn from_osm(way: &Way<'_>) -> Self {
        WayRecord {
            id: way.id(),
            tags: way
                .tags()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            refs: way.refs().collect(),
            meta: Some(WayMeta::from_info(&way.info())),
        }
    }

    /// A way is closed if its first and last node are the same node.
    pub fn is_closed(&self) -> bool {
        match (self.refs.first(), self.refs.last()) {
            (Some(first), Some(last)) => first == last,
            _ => false,
        }
    }

    pub fn tag_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Tags as a JSON object. Later duplicates of a key win.
    pub fn tags_json(&self) -> Map<String, Value> {
        self.tags
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

impl WayMeta {
    pub fn from_info(info: &Info) -> Self {
        WayMeta {
            version: info.version().map(i64::from),
            changeset: info.changeset(),
            timestamp: info.milli_timestamp().and_then(format_timestamp_millis),
            uid: info.uid().map(i64::from),
            user: info
                .user()
                .and_then(|user| user.ok())
                .map(|s| s.to_string()),
        }
    }

    /// Insert the fields that are present.
    pub fn extend_properties(&self, properties: &mut Map<String, Value>) {
        if let Some(version) = self.version {
            properties.insert("version".to_string(), Value::from(version));
        }
        if let Some(timestamp) = &self.timestamp {
            properties.insert("timestamp".to_string(), Value::String(timestamp.clone()));
        }
        if let Some(changeset) = self.changeset {
            properties.insert("changeset".to_string(), Value::from(changeset));
        }
        if let Some(uid) = self.uid {
            properties.insert("uid".to_string(), Value::from(uid));
        }
        if let Some(user) = &self.user {
            properties.insert("user".to_string(), Value::String(user.clone()));
        }
    }
}

pub fn format_timestamp_millis(millis: i64) -> Option<String> {
    let nanos = i128::from(millis) * 1_000_000;
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
    dt.format(&Rfc3339).ok()
}
