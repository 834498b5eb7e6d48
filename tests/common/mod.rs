use labelpack::dataset::{
    Annotation, AnnotationMap, BBoxXYWH, Category, Dataset, FileContent, FileId, ImageFile,
};

/// Minimal valid 24-bit BMP bytes with the given dimensions, for tests
/// that need decodable image content.
pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

/// A small working dataset: two annotated BMP files and two categories.
pub fn sample_dataset() -> Dataset {
    let mut annotations = AnnotationMap::new();
    annotations.insert(
        FileId(1),
        vec![
            Annotation::new(1u64, 0u64, BBoxXYWH::from_xywh(10.0, 10.0, 50.0, 50.0)),
            Annotation::new(2u64, 1u64, BBoxXYWH::from_xywh(0.0, 0.0, 25.0, 40.0)),
        ],
    );
    annotations.insert(
        FileId(2),
        vec![Annotation::new(
            3u64,
            0u64,
            BBoxXYWH::from_xywh(4.0, 6.0, 32.0, 16.0),
        )],
    );

    Dataset {
        files: vec![
            ImageFile::new(
                1u64,
                "img_a.bmp",
                FileContent::Bytes(bmp_bytes(100, 100)),
                100,
                100,
            ),
            ImageFile::new(
                2u64,
                "img_b.bmp",
                FileContent::Bytes(bmp_bytes(64, 48)),
                64,
                48,
            ),
        ],
        categories: vec![Category::at_index(0, "crane"), Category::at_index(1, "ship")],
        annotations,
    }
}
