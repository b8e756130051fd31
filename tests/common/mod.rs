#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const L2A_NS: &str = "https://psd-12.sentinel2.eo.esa.int/PSD/S2_PDI_Level-2A_Tile_Metadata.xsd";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Knobs for a synthetic tile written to disk
pub struct TileFixture {
    pub epsg: Option<&'static str>,
    /// Band ids that get a mean viewing incidence angle entry
    pub angle_bands: Vec<usize>,
    pub cloud_coverage: Option<&'static str>,
    pub vegetation: Option<&'static str>,
    pub sensing_time: &'static str,
    pub product_name: &'static str,
    pub with_mask: bool,
}

impl Default for TileFixture {
    fn default() -> Self {
        Self {
            epsg: Some("EPSG:32634"),
            angle_bands: (0..13).collect(),
            cloud_coverage: Some("12.345"),
            vegetation: Some("40.5"),
            sensing_time: "2020-01-01T09:32:41.024Z",
            product_name: "S2A_MSIL2A_20200101_T34TFP",
            with_mask: false,
        }
    }
}

pub fn metadata_xml(fixture: &TileFixture) -> String {
    let mut angles = String::new();
    for band in &fixture.angle_bands {
        write!(
            angles,
            r#"<Mean_Viewing_Incidence_Angle bandId="{band}">
                 <ZENITH_ANGLE unit="deg">{zenith}</ZENITH_ANGLE>
                 <AZIMUTH_ANGLE unit="deg">{azimuth}</AZIMUTH_ANGLE>
               </Mean_Viewing_Incidence_Angle>"#,
            band = band,
            zenith = 8.0 + *band as f64 * 0.1,
            azimuth = 100.0 + *band as f64,
        )
        .unwrap();
    }

    let geocoding = fixture
        .epsg
        .map(|code| format!("<HORIZONTAL_CS_CODE>{}</HORIZONTAL_CS_CODE>", code))
        .unwrap_or_default();
    let cloud = fixture
        .cloud_coverage
        .map(|v| format!("<CLOUD_COVERAGE_PERCENTAGE>{}</CLOUD_COVERAGE_PERCENTAGE>", v))
        .unwrap_or_default();
    let vegetation = fixture
        .vegetation
        .map(|v| format!("<VEGETATION_PERCENTAGE>{}</VEGETATION_PERCENTAGE>", v))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<n1:Level-2A_Tile_ID xmlns:n1="{ns}" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <n1:General_Info>
    <TILE_ID>S2A_OPER_MSI_L2A_TL_MTI__20200101T093241_A023604_T34TFP_N02.13</TILE_ID>
    <SENSING_TIME>{sensing}</SENSING_TIME>
  </n1:General_Info>
  <n1:Geometric_Info>
    <Tile_Geocoding>
      <HORIZONTAL_CS_NAME>WGS84 / UTM zone 34N</HORIZONTAL_CS_NAME>
      {geocoding}
    </Tile_Geocoding>
    <Tile_Angles>
      <Mean_Viewing_Incidence_Angle_List>{angles}</Mean_Viewing_Incidence_Angle_List>
    </Tile_Angles>
  </n1:Geometric_Info>
  <n1:Quality_Indicators_Info>
    <L2A_Image_Content_QI>{cloud}{vegetation}</L2A_Image_Content_QI>
  </n1:Quality_Indicators_Info>
</n1:Level-2A_Tile_ID>"#,
        ns = L2A_NS,
        sensing = fixture.sensing_time,
        geocoding = geocoding,
        angles = angles,
        cloud = cloud,
        vegetation = vegetation,
    )
}

pub fn tile_info_json(product_name: &str) -> String {
    format!(
        r#"{{
  "path": "tiles/34/T/FP/2020/1/1/0",
  "utmZone": 34,
  "latitudeBand": "T",
  "gridSquare": "FP",
  "productName": "{}",
  "tileDataGeometry": {{
    "type": "Polygon",
    "crs": {{"type": "name", "properties": {{"name": "urn:ogc:def:crs:EPSG:8.8.1:32634"}}}},
    "coordinates": [[[399960.0, 5000040.0], [509760.0, 5000040.0],
                     [509760.0, 4890240.0], [399960.0, 4890240.0],
                     [399960.0, 5000040.0]]]
  }}
}}"#,
        product_name
    )
}

/// Mask document with one feature per ring
pub fn cloud_mask_gml(rings: &[&str]) -> String {
    let mut features = String::new();
    for (i, ring) in rings.iter().enumerate() {
        write!(
            features,
            r#"<eop:maskMembers>
      <eop:MaskFeature gml:id="OPAQUE.{i}">
        <eop:maskType codeSpace="urn:oid:1.3.6.1.4.1.29346.1.1.1">OPAQUE</eop:maskType>
        <eop:extentOf>
          <gml:Polygon gml:id="OPAQUE.{i}.Polygon" srsName="urn:ogc:def:crs:EPSG::32634">
            <gml:exterior>
              <gml:LinearRing>
                <gml:posList srsDimension="2">{ring}</gml:posList>
              </gml:LinearRing>
            </gml:exterior>
          </gml:Polygon>
        </eop:extentOf>
      </eop:MaskFeature>
    </eop:maskMembers>"#,
            i = i,
            ring = ring,
        )
        .unwrap();
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<eop:Mask xmlns:eop="http://www.opengis.net/eop/2.0" xmlns:gml="http://www.opengis.net/gml/3.2"
          gml:id="S2A_OPER_MSK_CLOUDS_MTI__20200101T093241_A023604_T34TFP_B00_MSIL1C">
  <gml:boundedBy>
    <gml:Envelope srsName="urn:ogc:def:crs:EPSG::32634">
      <gml:lowerCorner>399960 4890240</gml:lowerCorner>
      <gml:upperCorner>509760 5000040</gml:upperCorner>
    </gml:Envelope>
  </gml:boundedBy>
  {features}
</eop:Mask>"#,
        features = features
    )
}

/// Write a tile directory under `root/name` and return its metadata.xml path
pub fn write_tile(root: &Path, name: &str, fixture: &TileFixture) -> PathBuf {
    let tile_dir = root.join(name);
    fs::create_dir_all(tile_dir.join("R10m")).unwrap();
    fs::create_dir_all(tile_dir.join("R20m")).unwrap();

    let metadata = tile_dir.join("metadata.xml");
    fs::write(&metadata, metadata_xml(fixture)).unwrap();
    fs::write(tile_dir.join("tileInfo.json"), tile_info_json(fixture.product_name)).unwrap();

    if fixture.with_mask {
        fs::create_dir_all(tile_dir.join("qi")).unwrap();
        fs::write(
            tile_dir.join("qi").join("MSK_CLOUDS_B00.gml"),
            cloud_mask_gml(&[
                "400000 4900000 400600 4900000 400600 4900600 400000 4900000",
                "500000 4950000 500200 4950000 500200 4950200 500000 4950200 500000 4950000",
            ]),
        )
        .unwrap();
    }
    metadata
}
