use super::items::{ProjectUnit, RawGeometry};

pub fn park(upid: i64, name: &str, wkt: &str) -> ProjectUnit {
    let mut unit = ProjectUnit::new(upid, name);
    unit.geometry = Some(RawGeometry::Wkt(wkt.into()));
    unit
}
