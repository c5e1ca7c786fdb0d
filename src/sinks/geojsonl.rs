use super::{WayFeature, WaySink};
use anyhow::Result;
use geojson::GeoJson;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One GeoJSON Feature per line.
pub struct GeoJsonlSink {
    writer: BufWriter<File>,
}

impl GeoJsonlSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl WaySink for GeoJsonlSink {
    fn write_way(&mut self, feature: WayFeature) -> Result<()> {
        let geojson = GeoJson::Feature(feature.into_geojson());
        serde_json::to_writer(&mut self.writer, &geojson)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
