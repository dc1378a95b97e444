//! Output surface and per-tile pixel work.

use std::io::Cursor;

use image::{imageops, ImageFormat, ImageReader, RgbaImage};

use crate::error::{Result, StitchError};
use crate::tile::TileRef;

use super::CompositionResult;

/// Read a tile's pixel dimensions from its header without decoding it.
pub fn probe_dimensions(tile: &TileRef) -> Result<(u32, u32)> {
    let bytes = tile.source.bytes()?;
    ImageReader::new(Cursor::new(&bytes[..]))
        .with_guessed_format()
        .map_err(|e| decode_error(tile, e))?
        .into_dimensions()
        .map_err(|e| decode_error(tile, e))
}

fn decode_error(tile: &TileRef, err: impl std::fmt::Display) -> StitchError {
    StitchError::TileDecode {
        identifier: tile.identifier.clone(),
        message: err.to_string(),
    }
}

/// The output raster. Starts fully transparent.
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    /// Allocate a transparent surface.
    ///
    /// Allocation is fallible: running out of memory surfaces as
    /// [`StitchError::SurfaceAllocation`] instead of aborting.
    pub fn allocate(width: u32, height: u32) -> Result<Self> {
        let alloc_error = || StitchError::SurfaceAllocation { width, height };

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(alloc_error)?;

        let mut buffer: Vec<u8> = Vec::new();
        buffer.try_reserve_exact(len).map_err(|_| alloc_error())?;
        buffer.resize(len, 0);

        let image = RgbaImage::from_raw(width, height, buffer).ok_or_else(alloc_error)?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Decode a tile and copy it onto the surface at `origin`.
    ///
    /// Pixels are replaced, not blended. Anything outside the surface is
    /// clipped. The decoded buffer is dropped before returning.
    pub fn draw_tile(&mut self, tile: &TileRef, origin: (i64, i64)) -> Result<()> {
        let decoded = {
            let bytes = tile.source.bytes()?;
            image::load_from_memory(&bytes)
                .map_err(|e| decode_error(tile, e))?
                .into_rgba8()
        };
        imageops::replace(&mut self.image, &decoded, origin.0, origin.1);
        Ok(())
    }

    /// Encode the surface as PNG.
    pub fn encode(self) -> Result<CompositionResult> {
        let (width, height) = self.image.dimensions();
        let mut png = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| StitchError::Encode {
                message: e.to_string(),
            })?;

        Ok(CompositionResult { png, width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::test_support::{decode, solid_png};
    use crate::tile::TileSource;

    fn tile_from(bytes: Vec<u8>) -> TileRef {
        TileRef {
            x: 0,
            y: 0,
            identifier: "0,0.png".to_string(),
            source: TileSource::Memory(bytes.into()),
        }
    }

    #[test]
    fn test_probe_dimensions() {
        let tile = tile_from(solid_png(7, 3, [1, 2, 3, 255]));
        assert_eq!(probe_dimensions(&tile).unwrap(), (7, 3));
    }

    #[test]
    fn test_probe_garbage() {
        let tile = tile_from(b"not an image".to_vec());
        match probe_dimensions(&tile) {
            Err(StitchError::TileDecode { identifier, .. }) => assert_eq!(identifier, "0,0.png"),
            other => panic!("expected TileDecode, got {:?}", other),
        }
    }

    #[test]
    fn test_allocate_is_transparent() {
        let surface = Surface::allocate(3, 2).unwrap();
        assert_eq!((surface.width(), surface.height()), (3, 2));
        assert!(surface.image.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_draw_tile_replaces_pixels() {
        let mut surface = Surface::allocate(4, 4).unwrap();
        let tile = tile_from(solid_png(2, 2, [255, 0, 0, 128]));

        surface.draw_tile(&tile, (2, 2)).unwrap();

        assert_eq!(surface.image.get_pixel(2, 2).0, [255, 0, 0, 128]);
        assert_eq!(surface.image.get_pixel(3, 3).0, [255, 0, 0, 128]);
        assert_eq!(surface.image.get_pixel(1, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_draw_tile_clips() {
        let mut surface = Surface::allocate(2, 2).unwrap();
        let tile = tile_from(solid_png(4, 4, [0, 255, 0, 255]));

        surface.draw_tile(&tile, (1, 1)).unwrap();

        assert_eq!(surface.image.get_pixel(1, 1).0, [0, 255, 0, 255]);
        assert_eq!(surface.image.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_draw_tile_decode_error() {
        let mut surface = Surface::allocate(2, 2).unwrap();
        let tile = tile_from(vec![0x89, b'P', b'N', b'G']);
        assert!(matches!(
            surface.draw_tile(&tile, (0, 0)),
            Err(StitchError::TileDecode { .. })
        ));
    }

    #[test]
    fn test_encode_round_trip() {
        let mut surface = Surface::allocate(2, 1).unwrap();
        surface
            .draw_tile(&tile_from(solid_png(1, 1, [9, 8, 7, 255])), (1, 0))
            .unwrap();

        let result = surface.encode().unwrap();
        assert_eq!((result.width, result.height), (2, 1));

        let img = decode(&result.png);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [9, 8, 7, 255]);
    }
}
