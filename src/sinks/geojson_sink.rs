use super::{WayFeature, WaySink};
use anyhow::Result;
use geojson::GeoJson;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const COLLECTION_OPEN: &str = "{\n  \"type\": \"FeatureCollection\",\n  \"features\": [\n";
const COLLECTION_CLOSE: &str = "\n  ]\n}\n";

/// A single FeatureCollection, streamed feature by feature.
pub struct GeoJsonSink {
    writer: BufWriter<File>,
    written: u64,
}

impl GeoJsonSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(COLLECTION_OPEN.as_bytes())?;
        Ok(Self { writer, written: 0 })
    }
}

impl WaySink for GeoJsonSink {
    fn write_way(&mut self, feature: WayFeature) -> Result<()> {
        if self.written > 0 {
            self.writer.write_all(b",\n")?;
        }
        serde_json::to_writer(&mut self.writer, &GeoJson::Feature(feature.into_geojson()))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.write_all(COLLECTION_CLOSE.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, LineString, Polygon};
    use serde_json::{Map, Value};
    use tempfile::NamedTempFile;

    fn way_feature(id: i64, geometry: Option<Geometry<f64>>) -> WayFeature {
        let mut tags = Map::new();
        tags.insert("building".to_string(), Value::String("yes".into()));
        let mut properties = Map::new();
        properties.insert("tags".to_string(), Value::Object(tags));
        WayFeature {
            id,
            geometry,
            properties,
        }
    }

    fn read(temp_file: &NamedTempFile) -> Value {
        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn writes_empty_feature_collection() {
        let temp_file = NamedTempFile::with_suffix(".geojson").unwrap();
        let mut sink = GeoJsonSink::new(temp_file.path()).unwrap();
        sink.finish().unwrap();

        let parsed = read(&temp_file);
        assert_eq!(parsed["type"], "FeatureCollection");
        assert!(parsed["features"].as_array().unwrap().is_empty());
    }

    #[test]
    fn writes_multiple_features_with_commas() {
        let temp_file = NamedTempFile::with_suffix(".geojson").unwrap();
        let mut sink = GeoJsonSink::new(temp_file.path()).unwrap();

        for id in 1..=3 {
            sink.write_way(way_feature(id, None)).unwrap();
        }
        sink.finish().unwrap();

        let parsed = read(&temp_file);
        let features = parsed["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[2]["id"], 3);
        assert_eq!(features[0]["properties"]["tags"]["building"], "yes");
    }

    #[test]
    fn writes_polygon_geometry() {
        let temp_file = NamedTempFile::with_suffix(".geojson").unwrap();
        let mut sink = GeoJsonSink::new(temp_file.path()).unwrap();

        let polygon = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            vec![],
        );
        sink.write_way(way_feature(5, Some(Geometry::Polygon(polygon))))
            .unwrap();
        sink.finish().unwrap();

        let parsed = read(&temp_file);
        assert_eq!(parsed["features"][0]["geometry"]["type"], "Polygon");
    }
}
