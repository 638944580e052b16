use proptest::prelude::*;

use tessera_core::geometry::{IRect, ISize};

use crate::packer::RectPacker;
use crate::sdf::convert_to_signed_distance_field;

// Property: whatever the packer accepts stays in bounds and never
// overlaps a previous placement.
proptest! {
    #[test]
    fn prop_packer_placements_disjoint_and_in_bounds(
        sizes in prop::collection::vec((1u32..40, 1u32..40), 1..60)
    ) {
        let area = ISize::new(128, 128);
        let mut packer = RectPacker::new(area.width, area.height);
        let mut placed: Vec<IRect> = Vec::new();

        for (w, h) in sizes {
            if let Some(origin) = packer.add(w, h) {
                let rect = IRect::new(origin.x, origin.y, w, h);
                prop_assert!(rect.contained_by(area), "escaped: {rect:?}");
                for other in &placed {
                    prop_assert!(!rect.intersects(other), "{rect:?} vs {other:?}");
                }
                placed.push(rect);
            }
        }
    }
}

// Property: the packer is a pure function of its insertion sequence.
proptest! {
    #[test]
    fn prop_packer_is_deterministic(
        sizes in prop::collection::vec((1u32..64, 1u32..64), 1..40)
    ) {
        let mut a = RectPacker::new(256, 256);
        let mut b = RectPacker::new(256, 256);
        for (w, h) in sizes {
            prop_assert_eq!(a.add(w, h), b.add(w, h));
        }
    }
}

// Property: the SDF transform never panics and always emits bytes
// (trivially true for u8 storage, but the run itself exercises every
// loop-bound edge case the sweeps have).
proptest! {
    #[test]
    fn prop_sdf_handles_arbitrary_bitmaps(
        width in 0u32..24,
        height in 0u32..24,
        seed in any::<u64>()
    ) {
        let len = (width * height) as usize;
        let mut pixels: Vec<u8> = (0..len)
            .map(|i| (seed.wrapping_mul(6364136223846793005).wrapping_add(i as u64) >> 32) as u8)
            .collect();
        convert_to_signed_distance_field(&mut pixels, width, height);
        prop_assert_eq!(pixels.len(), len);
    }
}

// Property: a uniform bitmap stays uniform through the transform.
proptest! {
    #[test]
    fn prop_sdf_uniform_input_uniform_output(value in any::<u8>()) {
        let mut pixels = vec![value; 16 * 16];
        convert_to_signed_distance_field(&mut pixels, 16, 16);
        let expected = if value > 0x7f { 255 } else { 0 };
        prop_assert!(pixels.iter().all(|&p| p == expected));
    }
}
