//! Ordering rules for the sorted buckets.

use std::cmp::Ordering;

use lumen_state::StateType;
use lumen_state::params::TextureState;

use crate::drawable::Drawable;

/// The enabled texture state of a drawable, if any.
pub fn texture_state(drawable: &dyn Drawable) -> Option<&TextureState> {
    drawable
        .world_state(StateType::Texture)
        .filter(|s| s.is_enabled())
        .and_then(|s| s.get::<TextureState>())
}

/// Group by bound textures to cut down on texture binds.
///
/// Units are compared up to the smaller of the two used-unit counts: an
/// empty unit sorts before a bound one, bound units compare by key. If all
/// of those match, the state using more units sorts first.
pub fn by_textures(a: &TextureState, b: &TextureState) -> Ordering {
    let shared = a.units_used().min(b.units_used());
    for unit in 0..shared {
        let ord = match (a.texture(unit), b.texture(unit)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.key.cmp(&y.key),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    b.units_used().cmp(&a.units_used())
}

/// Opaque order: texture grouping, or nearest first when neither side has
/// textures. A drawable without textures sorts before one with textures.
pub fn opaque(
    a: &dyn Drawable,
    b: &dyn Drawable,
    distances: impl FnOnce() -> (f32, f32),
) -> Ordering {
    match (texture_state(a), texture_state(b)) {
        (Some(x), Some(y)) => by_textures(x, y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => {
            let (da, db) = distances();
            nearest_first(da, db)
        }
    }
}

/// Ascending distance. The unmeasurable sentinel (negative infinity) comes first.
pub fn nearest_first(da: f32, db: f32) -> Ordering {
    da.partial_cmp(&db).unwrap_or(Ordering::Equal)
}

/// Descending distance, for back-to-front compositing.
pub fn farthest_first(da: f32, db: f32) -> Ordering {
    db.partial_cmp(&da).unwrap_or(Ordering::Equal)
}

/// Ascending ortho order.
pub fn ortho(a: &dyn Drawable, b: &dyn Drawable) -> Ordering {
    a.ortho_order().cmp(&b.ortho_order())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawable::MeshDrawable;
    use lumen_common::MeshHandle;
    use lumen_state::RenderState;
    use lumen_state::params::TextureUnit;

    fn ts(units: &[(usize, u64)]) -> TextureState {
        let mut ts = TextureState::default();
        for &(unit, key) in units {
            ts.set_texture(unit, Some(TextureUnit::new(key))).unwrap();
        }
        ts
    }

    #[test]
    fn texture_keys_order_first_differing_unit() {
        assert_eq!(by_textures(&ts(&[(0, 1)]), &ts(&[(0, 2)])), Ordering::Less);
        assert_eq!(
            by_textures(&ts(&[(0, 1), (1, 9)]), &ts(&[(0, 1), (1, 3)])),
            Ordering::Greater
        );
        assert_eq!(by_textures(&ts(&[(0, 4)]), &ts(&[(0, 4)])), Ordering::Equal);
    }

    #[test]
    fn empty_unit_sorts_first() {
        assert_eq!(by_textures(&ts(&[(1, 5)]), &ts(&[(0, 1), (1, 5)])), Ordering::Less);
        assert_eq!(by_textures(&ts(&[(0, 1), (1, 5)]), &ts(&[(1, 5)])), Ordering::Greater);
    }

    #[test]
    fn more_units_sorts_first_on_tie() {
        assert_eq!(by_textures(&ts(&[(0, 1), (1, 2)]), &ts(&[(0, 1)])), Ordering::Less);
        assert_eq!(by_textures(&ts(&[(0, 1)]), &ts(&[(0, 1), (1, 2)])), Ordering::Greater);
    }

    #[test]
    fn opaque_uses_distance_only_without_textures() {
        let plain = MeshDrawable::new("plain", MeshHandle(1));
        let textured = MeshDrawable::new("textured", MeshHandle(2))
            .with_state(RenderState::new(ts(&[(0, 1)])));

        assert_eq!(opaque(&plain, &plain, || (5.0, 1.0)), Ordering::Greater);
        assert_eq!(
            opaque(&plain, &textured, || unreachable!("distance not needed")),
            Ordering::Less
        );
        assert_eq!(
            opaque(&textured, &textured, || unreachable!("distance not needed")),
            Ordering::Equal
        );
    }

    #[test]
    fn disabled_texture_state_is_ignored() {
        let off = MeshDrawable::new("off", MeshHandle(1))
            .with_state(RenderState::disabled(ts(&[(0, 1)])));
        assert!(texture_state(&off).is_none());
    }

    #[test]
    fn sentinel_distance_ordering() {
        assert_eq!(nearest_first(f32::NEG_INFINITY, 0.0), Ordering::Less);
        assert_eq!(farthest_first(f32::NEG_INFINITY, 0.0), Ordering::Greater);
        assert_eq!(farthest_first(10.0, 1.0), Ordering::Less);
    }
}
