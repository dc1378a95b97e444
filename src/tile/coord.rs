//! Coordinate parsing for `x,y.ext` tile identifiers.

use tracing::debug;

use crate::error::{Result, StitchError};

use super::{TileInput, TileRef};

/// Separator between the x and y fields.
const SEPARATOR: char = ',';

/// Extract integer grid coordinates from a tile identifier.
///
/// Strips a trailing extension, then splits the remainder on `,` into exactly
/// two integer fields. Path-like identifiers are reduced to their last
/// component first.
///
/// ```
/// use tilestitch::parse_coords;
///
/// assert_eq!(parse_coords("3,-2.png"), Some((3, -2)));
/// assert_eq!(parse_coords("thumbs.db"), None);
/// ```
pub fn parse_coords(identifier: &str) -> Option<(i64, i64)> {
    let name = identifier.rsplit(['/', '\\']).next().unwrap_or(identifier);
    let base = strip_extension(name);

    let mut fields = base.split(SEPARATOR);
    let x = parse_field(fields.next()?)?;
    let y = parse_field(fields.next()?)?;
    if fields.next().is_some() {
        return None;
    }

    Some((x, y))
}

/// Remove a final `.ext`, where `ext` is non-empty.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => &name[..dot],
        _ => name,
    }
}

fn parse_field(field: &str) -> Option<i64> {
    field.trim().parse().ok()
}

/// Parse every input, keeping the ones with valid coordinates in input order.
///
/// Inputs without `x,y` identifiers are not an error: they are skipped so
/// that unrelated files can sit alongside the tiles. Fails only when nothing
/// usable is left.
pub fn collect_tiles<I>(inputs: I) -> Result<Vec<TileRef>>
where
    I: IntoIterator<Item = TileInput>,
{
    let tiles: Vec<TileRef> = inputs
        .into_iter()
        .filter_map(|input| match parse_coords(&input.identifier) {
            Some((x, y)) => Some(TileRef {
                x,
                y,
                identifier: input.identifier,
                source: input.source,
            }),
            None => {
                debug!(identifier = %input.identifier, "Skipping tile without x,y name");
                None
            }
        })
        .collect();

    if tiles.is_empty() {
        return Err(StitchError::NoValidTiles);
    }

    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(parse_coords("0,0.png"), Some((0, 0)));
        assert_eq!(parse_coords("12,7.jpg"), Some((12, 7)));
    }

    #[test]
    fn test_parse_negative_and_signed() {
        assert_eq!(parse_coords("-3,-1.png"), Some((-3, -1)));
        assert_eq!(parse_coords("+2,5.webp"), Some((2, 5)));
    }

    #[test]
    fn test_parse_any_extension() {
        assert_eq!(parse_coords("1,2.tiff"), Some((1, 2)));
        assert_eq!(parse_coords("1,2.PNG"), Some((1, 2)));
    }

    #[test]
    fn test_parse_without_extension() {
        assert_eq!(parse_coords("4,5"), Some((4, 5)));
    }

    #[test]
    fn test_parse_only_last_extension_stripped() {
        // "1,2.tile" remains after stripping ".png"; "2.tile" is not an integer
        assert_eq!(parse_coords("1,2.tile.png"), None);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_coords(" 1, 2 .png"), Some((1, 2)));
    }

    #[test]
    fn test_parse_path_identifier() {
        assert_eq!(parse_coords("tiles/row.a/3,4.png"), Some((3, 4)));
        assert_eq!(parse_coords("C:\\tiles\\5,6.png"), Some((5, 6)));
    }

    #[test]
    fn test_parse_wrong_field_count() {
        assert_eq!(parse_coords("foo.png"), None);
        assert_eq!(parse_coords("1.png"), None);
        assert_eq!(parse_coords("1,2,3.png"), None);
        assert_eq!(parse_coords(",.png"), None);
    }

    #[test]
    fn test_parse_non_integer_fields() {
        assert_eq!(parse_coords("a,b.png"), None);
        assert_eq!(parse_coords("1,.png"), None);
        assert_eq!(parse_coords("1.5,2.png"), None);
        assert_eq!(parse_coords("NaN,1.png"), None);
        assert_eq!(parse_coords("Infinity,1.png"), None);
        assert_eq!(parse_coords("1e3,1.png"), None);
    }

    #[test]
    fn test_collect_keeps_input_order_and_drops_invalid() {
        let inputs = vec![
            TileInput::from_bytes("1,0.png", Vec::<u8>::new()),
            TileInput::from_bytes("readme.txt", Vec::<u8>::new()),
            TileInput::from_bytes("0,0.png", Vec::<u8>::new()),
        ];

        let tiles = collect_tiles(inputs).unwrap();

        assert_eq!(tiles.len(), 2);
        assert_eq!((tiles[0].x, tiles[0].y), (1, 0));
        assert_eq!(tiles[0].identifier, "1,0.png");
        assert_eq!((tiles[1].x, tiles[1].y), (0, 0));
    }

    #[test]
    fn test_collect_all_invalid() {
        let inputs = vec![
            TileInput::from_bytes("foo.png", Vec::<u8>::new()),
            TileInput::from_bytes("bar.png", Vec::<u8>::new()),
        ];

        assert!(matches!(
            collect_tiles(inputs),
            Err(StitchError::NoValidTiles)
        ));
    }

    #[test]
    fn test_collect_empty() {
        assert!(matches!(
            collect_tiles(Vec::new()),
            Err(StitchError::NoValidTiles)
        ));
    }
}
