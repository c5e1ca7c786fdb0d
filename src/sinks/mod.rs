use anyhow::Result;
use geo_types::Geometry;
use geojson::Feature;
use geojson::feature::Id;
use serde_json::{Map, Value};

pub mod geojson_sink;
pub mod geojsonl;

pub use self::geojson_sink::GeoJsonSink;
pub use self::geojsonl::GeoJsonlSink;

/// One way ready to be written to a channel.
#[derive(Clone, Debug)]
pub struct WayFeature {
    pub id: i64,
    pub geometry: Option<Geometry<f64>>,
    pub properties: Map<String, Value>,
}

impl WayFeature {
    pub fn into_geojson(self) -> Feature {
        Feature {
            bbox: None,
            geometry: self.geometry.as_ref().map(geojson::Geometry::from),
            id: Some(Id::Number(self.id.into())),
            properties: Some(self.properties),
            foreign_members: None,
        }
    }
}

pub trait WaySink: Send {
    fn write_way(&mut self, feature: WayFeature) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}
