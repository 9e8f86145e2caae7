use ndarray::{Array2, Array3};
use sdrl::{
    Band, BandAttribute, BandRegistry, BlockData, BlockMode, MemoryRaster, SatelliteReader,
    SdrlError, Wavelength, Window,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn band(tag: &str, order: usize, wavelength: (f64, f64), description: &str) -> Band {
    Band::new(
        tag,
        order,
        16.0,
        Some(Wavelength::Range(wavelength.0, wavelength.1)),
        Some(description.to_string()),
    )
}

fn gf1_registry() -> BandRegistry {
    BandRegistry::new(vec![
        band("B1", 1, (450.0, 520.0), "Blue"),
        band("B2", 2, (520.0, 590.0), "Green"),
        band("B3", 3, (630.0, 690.0), "Red"),
        band("B4", 4, (770.0, 890.0), "NIR"),
    ])
}

/// 4-band raster where band b holds `b * 10_000 + row * width + col` (b from 0)
fn gradient_raster(height: usize, width: usize) -> MemoryRaster {
    MemoryRaster::new(Array3::from_shape_fn((4, height, width), |(b, r, c)| {
        (b * 10_000 + r * width + c) as f32
    }))
}

fn open_reader(height: usize, width: usize) -> SatelliteReader<MemoryRaster> {
    let mut reader = SatelliteReader::with_registry("GF1_WFV", gf1_registry());
    reader.attach(gradient_raster(height, width)).unwrap();
    reader
}

#[test]
fn test_blocks_have_uniform_shape_on_partial_edges() {
    init_logging();
    let reader = open_reader(700, 1000);

    for mode in ["ALL", "RGB", "NDVI"] {
        let blocks: Vec<_> = reader
            .iter_blocks((512, 512), mode)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(blocks.len(), 4, "mode {}", mode);

        for block in &blocks {
            let shape = block.data.shape();
            assert_eq!(&shape[..2], &[512, 512], "mode {} window {}", mode, block.window);
        }
        assert_eq!(blocks[3].window, Window::new(512, 512, 488, 188));
    }
}

#[test]
fn test_all_mode_pads_with_zeros() {
    let reader = open_reader(10, 7);
    let blocks: Vec<_> = reader
        .iter_blocks((4, 4), "ALL")
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(blocks.len(), 3 * 2);

    // Bottom-right window covers rows 8..10, cols 4..7
    let last = &blocks[5];
    assert_eq!(last.window, Window::new(4, 8, 3, 2));
    let BlockData::Bands(data) = &last.data else {
        panic!("expected raw bands");
    };
    assert_eq!(data.dim(), (4, 4, 4));
    assert_eq!(data[[0, 0, 0]], (8 * 7 + 4) as f32);
    assert_eq!(data[[1, 2, 3]], (30_000 + 9 * 7 + 6) as f32);
    assert_eq!(data[[1, 3, 0]], 0.0);
    assert_eq!(data[[2, 0, 2]], 0.0);
}

#[test]
fn test_index_mode_matches_compute_index() {
    let reader = open_reader(9, 9);
    let expected = reader.compute_index("GNDVI", Some(Window::new(5, 0, 5, 5))).unwrap();

    let second = reader
        .iter_blocks((5, 5), BlockMode::Index("GNDVI".into()))
        .unwrap()
        .nth(1)
        .unwrap()
        .unwrap();
    let BlockData::Gray(data) = second.data else {
        panic!("expected index values");
    };
    assert_eq!(data.dim(), (5, 5));
    assert_eq!(data.slice(ndarray::s![..5, ..4]), expected);
    assert!(data.column(4).iter().all(|&v| v == 0.0));
}

#[test]
fn test_block_iteration_is_lazy() {
    let reader = open_reader(64, 64);
    let raster = reader.source().unwrap();

    let mut blocks = reader.iter_blocks((16, 16), "ALL").unwrap();
    assert_eq!(raster.reads(), 0);
    blocks.next().unwrap().unwrap();
    assert_eq!(raster.reads(), 1);
    blocks.next().unwrap().unwrap();
    drop(blocks);
    assert_eq!(raster.reads(), 2);

    // Each call starts again from the first tile
    let first = reader.iter_blocks((16, 16), "ALL").unwrap().next().unwrap().unwrap();
    assert_eq!(first.window, Window::new(0, 0, 16, 16));
}

#[test]
fn test_band_count_mismatch_leaves_nothing_bound() {
    let registry = BandRegistry::new(
        (1..=5)
            .map(|order| band(&format!("B{}", order), order, (0.0, 1.0), "x"))
            .collect(),
    );
    let mut reader = SatelliteReader::with_registry("five", registry);

    let three_bands = MemoryRaster::new(Array3::zeros((3, 8, 8)));
    let result = reader.attach(three_bands);
    assert!(matches!(
        result,
        Err(SdrlError::BandCountMismatch { raster: 3, registry: 5 })
    ));
    assert!(!reader.is_open());
    assert_eq!(reader.width(), None);
    assert_eq!(reader.height(), None);
    assert_eq!(reader.band_count(), None);
    assert!(matches!(reader.read_window(None), Err(SdrlError::NotOpened)));
}

#[test]
fn test_failed_attach_releases_previous_raster() {
    let mut reader = open_reader(8, 8);
    assert_eq!(reader.width(), Some(8));

    let result = reader.attach(MemoryRaster::new(Array3::zeros((2, 4, 4))));
    assert!(result.is_err());
    assert!(matches!(
        reader.get_band("Red", BandAttribute::Description, None),
        Err(SdrlError::NotOpened)
    ));

    reader.attach(gradient_raster(3, 5)).unwrap();
    assert_eq!((reader.width(), reader.height()), (Some(5), Some(3)));
}

#[test]
fn test_ndvi_of_zero_bands_is_zero() {
    let mut reader = SatelliteReader::with_registry("GF1_WFV", gf1_registry());
    reader.attach(MemoryRaster::new(Array3::zeros((4, 6, 6)))).unwrap();

    let ndvi = reader.compute_index("NDVI", None).unwrap();
    assert_eq!(ndvi.dim(), (6, 6));
    assert!(ndvi.iter().all(|v| v.is_finite() && *v == 0.0));
}

#[test]
fn test_compute_index_values() {
    let mut reader = SatelliteReader::with_registry("GF1_WFV", gf1_registry());
    let bands = vec![
        Array2::from_elem((2, 2), 0.05f32),
        Array2::from_elem((2, 2), 0.10),
        Array2::from_elem((2, 2), 0.20),
        Array2::from_elem((2, 2), 0.60),
    ];
    reader.attach(MemoryRaster::from_bands(bands).unwrap()).unwrap();

    let check = |name: &str, expected: f32| {
        let values = reader.compute_index(name, None).unwrap();
        for &v in values.iter() {
            approx::assert_abs_diff_eq!(v, expected, epsilon = 1e-5);
        }
    };
    check("NDVI", 0.5);
    check("DVI", 0.4);
    check("RVI", 3.0);
    check("GCVI", 5.0);
    check("NDWI", -5.0 / 7.0);
    // 2.5 * 0.4 / (0.6 + 1.2 - 0.375 + 1)
    check("EVI", 1.0 / 2.425);
}

#[test]
fn test_lookup_errors_keep_reader_usable() {
    let reader = open_reader(4, 4);
    assert!(matches!(
        reader.get_band("SWIR", BandAttribute::Description, None),
        Err(SdrlError::BandNotFound { .. })
    ));
    assert!(matches!(
        reader.compute_index("SAVI", None),
        Err(SdrlError::UnknownIndex(_))
    ));
    assert!(matches!(
        reader.get_band("Red", BandAttribute::Description, Some(Window::new(5, 0, 1, 1))),
        Err(SdrlError::InvalidWindow(_))
    ));
    assert!(reader.get_band("Red", BandAttribute::Description, None).is_ok());
}

#[test]
fn test_ambiguous_wavelength_uses_registry_order() {
    let registry = BandRegistry::new(vec![
        band("WIDE", 1, (400.0, 900.0), "Pan"),
        band("R", 2, (620.0, 670.0), "Red"),
    ]);
    let mut reader = SatelliteReader::with_registry("pan", registry);
    let data = Array3::from_shape_fn((2, 2, 2), |(b, _, _)| b as f32 + 1.0);
    reader.attach(MemoryRaster::new(data)).unwrap();

    let band = reader.get_band(650, BandAttribute::Wavelength, None).unwrap();
    assert!(band.iter().all(|&v| v == 1.0));
}

#[test]
fn test_epsilon_is_configurable() {
    let mut reader = SatelliteReader::with_registry("GF1_WFV", gf1_registry());
    reader.attach(MemoryRaster::new(Array3::zeros((4, 2, 2)))).unwrap();
    reader.set_epsilon(1.0);
    assert_eq!(reader.epsilon(), 1.0);

    let rvi = reader.compute_index("RVI", None).unwrap();
    assert!(rvi.iter().all(|&v| v == 1.0));
}

#[test]
fn test_summary_mentions_sensor_and_bands() {
    let reader = open_reader(2, 2);
    let summary = reader.summary();
    assert!(summary.starts_with("Sensor: GF1_WFV"));
    assert!(summary.contains("NIR"));
    assert_eq!(summary.lines().count(), 6);
}

#[test]
fn test_rgb_u8_passes_byte_rasters_through() {
    let registry = BandRegistry::new(vec![
        Band::new("R", 1, 1.0, None, Some("Red".to_string())),
        Band::new("G", 2, 1.0, None, Some("Green".to_string())),
        Band::new("B", 3, 1.0, None, Some("Blue".to_string())),
    ]);
    let mut reader = SatelliteReader::with_registry("ElectronicMap", registry);
    let data = Array3::from_shape_fn((3, 2, 2), |(b, r, c)| (10 + 20 * (r * 2 + c) + b) as u8);
    reader.attach(MemoryRaster::from_u8(data)).unwrap();

    let rgb = reader.get_rgb_u8(None).unwrap();
    let red: Vec<u8> = rgb.index_axis(ndarray::Axis(2), 0).iter().copied().collect();
    assert_eq!(red, vec![10, 30, 50, 70]);
    assert_eq!(rgb[[1, 1, 2]], 72);

    // Blocks are not re-stretched per tile either
    let block = reader.iter_blocks((1, 2), "RGB").unwrap().nth(1).unwrap().unwrap();
    let BlockData::Rgb(data) = block.data else {
        panic!("expected RGB block");
    };
    assert_eq!(data[[0, 0, 0]], 50);
    assert_eq!(data[[0, 1, 0]], 70);
}
