//! Reconstruction of the sparse tile grid into one contiguous raster.
//!
//! Rows are the y-ordered tiles sharing one x coordinate, concatenated
//! side by side; the composite is the x-ordered stack of rows. A row
//! whose tiles disagree on height is dropped with a warning instead of
//! aborting the run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use image::{RgbaImage, imageops};
use owo_colors::OwoColorize;

use crate::error::PipelineError;
use crate::manifest::read_manifest;

pub struct GridReconstructor {
    grid: BTreeMap<i64, BTreeMap<i64, RgbaImage>>,
    loaded: bool,
    output_path: PathBuf,
}

impl GridReconstructor {
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            grid: BTreeMap::new(),
            loaded: false,
            output_path,
        }
    }

    /// Reads the manifest and buckets each decodable tile by its
    /// (x, y) grid coordinate. Rows with non-numeric coordinates and
    /// unreadable tile files are dropped; a duplicate coordinate keeps
    /// the later record. Fails when no cell could be populated.
    pub fn load(&mut self, manifest_path: &Path) -> Result<(), PipelineError> {
        let records = read_manifest(manifest_path)?;
        self.grid.clear();
        self.loaded = false;
        for record in &records {
            let (Ok(x), Ok(y)) = (record.x.parse::<i64>(), record.y.parse::<i64>()) else {
                continue;
            };
            let Some(image) = load_tile(&record.path_file) else {
                continue;
            };
            self.grid.entry(x).or_default().insert(y, image);
        }
        if self.grid.is_empty() {
            return Err(PipelineError::Processing(
                "no usable tiles in manifest".to_string(),
            ));
        }
        self.loaded = true;
        Ok(())
    }

    /// Stitches the loaded grid and persists the composite, overwriting
    /// any prior output. Calling this before a successful [`load`] is a
    /// programmer error and propagates.
    ///
    /// [`load`]: GridReconstructor::load
    pub fn assemble(&self) -> Result<PathBuf> {
        if !self.loaded {
            bail!("assemble called before a successful load");
        }

        let mut rows: Vec<RgbaImage> = Vec::new();
        for (x, tiles) in &self.grid {
            match concat_row(tiles) {
                Some(row) => rows.push(row),
                None => println!(
                    "{} Skipping grid row x={x} due to mismatched tile heights",
                    "⚠".yellow().bold()
                ),
            }
        }
        if rows.is_empty() {
            return Err(PipelineError::Processing("no rows could be combined".to_string()).into());
        }

        // rows may disagree on width; the canvas takes the widest and
        // narrower rows leave transparent padding on the right
        let width = rows.iter().map(|row| row.width()).max().unwrap_or(0);
        let height: u32 = rows.iter().map(|row| row.height()).sum();
        let mut composite = RgbaImage::new(width, height);
        let mut offset_y: i64 = 0;
        for row in &rows {
            imageops::replace(&mut composite, row, 0, offset_y);
            offset_y += row.height() as i64;
        }

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory {}", parent.display())
                })?;
            }
        }
        composite
            .save(&self.output_path)
            .with_context(|| format!("Failed to save composite {}", self.output_path.display()))?;
        Ok(self.output_path.clone())
    }
}

/// Concatenates one grid row side by side in ascending y order, or
/// reports `None` when the tiles disagree on height.
fn concat_row(tiles: &BTreeMap<i64, RgbaImage>) -> Option<RgbaImage> {
    let height = tiles.values().next()?.height();
    if tiles.values().any(|tile| tile.height() != height) {
        return None;
    }
    let width: u32 = tiles.values().map(|tile| tile.width()).sum();
    let mut row = RgbaImage::new(width, height);
    let mut offset_x: i64 = 0;
    for tile in tiles.values() {
        imageops::replace(&mut row, tile, offset_x, 0);
        offset_x += tile.width() as i64;
    }
    Some(row)
}

/// Guarded decode: traversal-like paths and corrupt files yield `None`,
/// dropping the tile from the grid.
fn load_tile(path: &str) -> Option<RgbaImage> {
    if path.is_empty() || path.contains("..") {
        return None;
    }
    image::open(path).ok().map(|image| image.into_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{TileRecord, write_manifest};
    use image::Rgba;

    const TILE_W: u32 = 8;
    const TILE_H: u32 = 6;

    fn solid_tile(dir: &Path, name: &str, w: u32, h: u32, color: [u8; 4]) -> String {
        let path = dir.join(name);
        RgbaImage::from_pixel(w, h, Rgba(color)).save(&path).unwrap();
        path.display().to_string()
    }

    fn record(id: u32, path: String, x: &str, y: &str) -> TileRecord {
        TileRecord {
            id,
            subject: "test".to_string(),
            path_file: path,
            url_pic: format!("https://mt.google.com/vt/lyrs=y&x={x}&y={y}"),
            x: x.to_string(),
            y: y.to_string(),
        }
    }

    fn write_records(dir: &Path, records: &[TileRecord]) -> PathBuf {
        let path = dir.join("manifest.csv");
        write_manifest(&path, records).unwrap();
        path
    }

    #[test]
    fn assembles_a_two_by_two_grid() {
        let dir = tempfile::tempdir().unwrap();
        let red = solid_tile(dir.path(), "r.png", TILE_W, TILE_H, [255, 0, 0, 255]);
        let green = solid_tile(dir.path(), "g.png", TILE_W, TILE_H, [0, 255, 0, 255]);
        let blue = solid_tile(dir.path(), "b.png", TILE_W, TILE_H, [0, 0, 255, 255]);
        let white = solid_tile(dir.path(), "w.png", TILE_W, TILE_H, [255, 255, 255, 255]);
        let manifest = write_records(
            dir.path(),
            &[
                record(0, red, "0", "0"),
                record(1, green, "0", "1"),
                record(2, blue, "1", "0"),
                record(3, white, "1", "1"),
            ],
        );

        let output = dir.path().join("composite.png");
        let mut reconstructor = GridReconstructor::new(output.clone());
        reconstructor.load(&manifest).unwrap();
        let saved = reconstructor.assemble().unwrap();
        assert_eq!(saved, output);

        let composite = image::open(&output).unwrap().into_rgba8();
        assert_eq!(composite.dimensions(), (2 * TILE_W, 2 * TILE_H));
        // tile (0,0) lands in the top-left cell
        assert_eq!(composite.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(composite.get_pixel(TILE_W, 0).0, [0, 255, 0, 255]);
        assert_eq!(composite.get_pixel(0, TILE_H).0, [0, 0, 255, 255]);
        assert_eq!(composite.get_pixel(TILE_W, TILE_H).0, [255, 255, 255, 255]);
    }

    #[test]
    fn mismatched_height_drops_only_that_row() {
        let dir = tempfile::tempdir().unwrap();
        let a = solid_tile(dir.path(), "a.png", TILE_W, TILE_H, [10, 10, 10, 255]);
        let b = solid_tile(dir.path(), "b.png", TILE_W, TILE_H + 3, [20, 20, 20, 255]);
        let c = solid_tile(dir.path(), "c.png", TILE_W, TILE_H, [30, 30, 30, 255]);
        let manifest = write_records(
            dir.path(),
            &[
                record(0, a, "0", "0"),
                record(1, b, "0", "1"),
                record(2, c, "1", "0"),
            ],
        );

        let output = dir.path().join("composite.png");
        let mut reconstructor = GridReconstructor::new(output.clone());
        reconstructor.load(&manifest).unwrap();
        reconstructor.assemble().unwrap();

        let composite = image::open(&output).unwrap().into_rgba8();
        // only the x=1 row survives
        assert_eq!(composite.dimensions(), (TILE_W, TILE_H));
        assert_eq!(composite.get_pixel(0, 0).0, [30, 30, 30, 255]);
    }

    #[test]
    fn narrower_rows_are_padded_to_the_widest() {
        let dir = tempfile::tempdir().unwrap();
        let a = solid_tile(dir.path(), "a.png", TILE_W, TILE_H, [40, 40, 40, 255]);
        let b = solid_tile(dir.path(), "b.png", TILE_W, TILE_H, [50, 50, 50, 255]);
        let c = solid_tile(dir.path(), "c.png", TILE_W, TILE_H, [60, 60, 60, 255]);
        let manifest = write_records(
            dir.path(),
            &[
                record(0, a, "0", "0"),
                record(1, b, "0", "1"),
                record(2, c, "1", "0"),
            ],
        );

        let output = dir.path().join("composite.png");
        let mut reconstructor = GridReconstructor::new(output.clone());
        reconstructor.load(&manifest).unwrap();
        reconstructor.assemble().unwrap();

        let composite = image::open(&output).unwrap().into_rgba8();
        // canvas takes the widest row, the short row keeps its pixels
        // at x = 0 and transparent padding beyond its own width
        assert_eq!(composite.dimensions(), (2 * TILE_W, 2 * TILE_H));
        assert_eq!(composite.get_pixel(0, TILE_H).0, [60, 60, 60, 255]);
        assert_eq!(composite.get_pixel(TILE_W, TILE_H).0, [0, 0, 0, 0]);
    }

    #[test]
    fn duplicate_coordinates_keep_the_later_record() {
        let dir = tempfile::tempdir().unwrap();
        let first = solid_tile(dir.path(), "first.png", TILE_W, TILE_H, [1, 1, 1, 255]);
        let second = solid_tile(dir.path(), "second.png", TILE_W, TILE_H, [2, 2, 2, 255]);
        let manifest = write_records(
            dir.path(),
            &[record(0, first, "0", "0"), record(1, second, "0", "0")],
        );

        let output = dir.path().join("composite.png");
        let mut reconstructor = GridReconstructor::new(output.clone());
        reconstructor.load(&manifest).unwrap();
        reconstructor.assemble().unwrap();

        let composite = image::open(&output).unwrap().into_rgba8();
        assert_eq!(composite.get_pixel(0, 0).0, [2, 2, 2, 255]);
    }

    #[test]
    fn unreadable_and_non_numeric_rows_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let good = solid_tile(dir.path(), "good.png", TILE_W, TILE_H, [5, 5, 5, 255]);
        let missing = dir.path().join("missing.png").display().to_string();
        let manifest = write_records(
            dir.path(),
            &[
                record(0, good, "0", "0"),
                record(1, missing, "0", "1"),
                record(2, "whatever.png".to_string(), "north", "east"),
            ],
        );

        let output = dir.path().join("composite.png");
        let mut reconstructor = GridReconstructor::new(output.clone());
        reconstructor.load(&manifest).unwrap();
        reconstructor.assemble().unwrap();
        let composite = image::open(&output).unwrap().into_rgba8();
        assert_eq!(composite.dimensions(), (TILE_W, TILE_H));
    }

    #[test]
    fn load_fails_when_nothing_is_usable() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_records(
            dir.path(),
            &[record(0, "nowhere.png".to_string(), "0", "0")],
        );
        let mut reconstructor = GridReconstructor::new(dir.path().join("out.png"));
        let err = reconstructor.load(&manifest).unwrap_err();
        assert!(matches!(err, PipelineError::Processing(_)));
    }

    #[test]
    fn assemble_before_load_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let reconstructor = GridReconstructor::new(dir.path().join("out.png"));
        assert!(reconstructor.assemble().is_err());
    }

    #[test]
    fn reassembly_produces_identical_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let a = solid_tile(dir.path(), "a.png", TILE_W, TILE_H, [9, 9, 9, 255]);
        let b = solid_tile(dir.path(), "b.png", TILE_W, TILE_H, [8, 8, 8, 255]);
        let manifest = write_records(
            dir.path(),
            &[record(0, a, "0", "0"), record(1, b, "0", "1")],
        );

        let output = dir.path().join("composite.png");
        let mut reconstructor = GridReconstructor::new(output.clone());
        reconstructor.load(&manifest).unwrap();
        reconstructor.assemble().unwrap();
        let first = image::open(&output).unwrap().into_rgba8().dimensions();

        reconstructor.load(&manifest).unwrap();
        reconstructor.assemble().unwrap();
        let second = image::open(&output).unwrap().into_rgba8().dimensions();
        assert_eq!(first, second);
    }
}
