//! Sentinel-2 band table and per-resolution composite profiles

use crate::types::{BandSpec, Resolution};

const fn band(
    name: &'static str,
    index: usize,
    filename: &'static str,
    wavelength_min: f64,
    wavelength_max: f64,
) -> BandSpec {
    BandSpec {
        name,
        index,
        filename,
        wavelength_min,
        wavelength_max,
    }
}

/// All 13 MSI bands, ordered by source band index
pub static BAND_SPECS: [BandSpec; 13] = [
    band("B01", 0, "B01.jp2", 433.0, 453.0),
    band("B02", 1, "B02.jp2", 458.0, 522.0),
    band("B03", 2, "B03.jp2", 543.0, 577.0),
    band("B04", 3, "B04.jp2", 650.0, 680.0),
    band("B05", 4, "B05.jp2", 698.0, 712.0),
    band("B06", 5, "B06.jp2", 733.0, 747.0),
    band("B07", 6, "B07.jp2", 773.0, 793.0),
    band("B08", 7, "B08.jp2", 784.0, 899.0),
    band("B8A", 8, "B8A.jp2", 855.0, 875.0),
    band("B09", 9, "B09.jp2", 935.0, 955.0),
    band("B10", 10, "B10.jp2", 1360.0, 1390.0),
    band("B11", 11, "B11.jp2", 1565.0, 1655.0),
    band("B12", 12, "B12.jp2", 2100.0, 2280.0),
];

/// Band lookup by source band index
pub fn band_spec(index: usize) -> Option<&'static BandSpec> {
    BAND_SPECS.iter().find(|b| b.index == index)
}

/// Bands and host templates used to build one resolution's composite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionProfile {
    pub resolution: Resolution,
    pub band_indices: &'static [usize],
    pub function_template: &'static str,
    pub processing_template: &'static str,
    pub output_dataset_tag: &'static str,
    pub raster_type_name: &'static str,
    pub builder_name: &'static str,
}

impl ResolutionProfile {
    /// Band specs in composite order
    pub fn bands(&self) -> impl Iterator<Item = &'static BandSpec> + '_ {
        self.band_indices.iter().filter_map(|&i| band_spec(i))
    }

    pub fn band_count(&self) -> usize {
        self.band_indices.len()
    }
}

static PROFILE_10M: ResolutionProfile = ResolutionProfile {
    resolution: Resolution::R10m,
    band_indices: &[1, 2, 3, 7],
    function_template: "Composite4Bands.rft.xml",
    processing_template: "Composite10mBands",
    output_dataset_tag: "10m-4Band",
    raster_type_name: "Sentinel-2-L2A-10mTile",
    builder_name: "Sentinel210mTileBuilder",
};

static PROFILE_20M: ResolutionProfile = ResolutionProfile {
    resolution: Resolution::R20m,
    band_indices: &[1, 2, 3, 4, 5, 6, 8, 11, 12],
    function_template: "Composite9Bands.rft.xml",
    processing_template: "Composite20mBands",
    output_dataset_tag: "20m-9Band",
    raster_type_name: "Sentinel-2-L2A-20mTile",
    builder_name: "Sentinel220mTileBuilder",
};

impl Resolution {
    pub fn profile(&self) -> &'static ResolutionProfile {
        match self {
            Resolution::R10m => &PROFILE_10M,
            Resolution::R20m => &PROFILE_20M,
        }
    }
}
