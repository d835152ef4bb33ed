use sdl2::keyboard::Keycode;

/// # Keymap
/// Chip-8 input is generated with a hexadecimal keypad.
///
/// The keypad is mapped onto the left 4 alphanumeric columns of a QWERTY keyboard.
/// ```text
/// |1|2|3|C|      |1|2|3|4|
/// |4|5|6|D|  ->  |Q|W|E|R|
/// |7|8|9|E|  ->  |A|S|D|F|
/// |A|0|B|F|      |Z|X|C|V|
/// ```
pub fn keymap(key: Keycode) -> Option<u8> {
    let hex = match key {
        Keycode::X => 0x0,
        Keycode::Num1 => 0x1,
        Keycode::Num2 => 0x2,
        Keycode::Num3 => 0x3,
        Keycode::Q => 0x4,
        Keycode::W => 0x5,
        Keycode::E => 0x6,
        Keycode::A => 0x7,
        Keycode::S => 0x8,
        Keycode::D => 0x9,
        Keycode::Z => 0xA,
        Keycode::C => 0xB,
        Keycode::Num4 => 0xC,
        Keycode::R => 0xD,
        Keycode::F => 0xE,
        Keycode::V => 0xF,
        _ => return None,
    };
    Some(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keymap_covers_every_key_once() {
        let block = [
            Keycode::Num1,
            Keycode::Num2,
            Keycode::Num3,
            Keycode::Num4,
            Keycode::Q,
            Keycode::W,
            Keycode::E,
            Keycode::R,
            Keycode::A,
            Keycode::S,
            Keycode::D,
            Keycode::F,
            Keycode::Z,
            Keycode::X,
            Keycode::C,
            Keycode::V,
        ];
        let mut seen = [false; 16];
        for key in block {
            let hex = keymap(key).unwrap();
            assert!(!seen[hex as usize]);
            seen[hex as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_keymap_corners() {
        assert_eq!(keymap(Keycode::Num1), Some(0x1));
        assert_eq!(keymap(Keycode::Num4), Some(0xC));
        assert_eq!(keymap(Keycode::Z), Some(0xA));
        assert_eq!(keymap(Keycode::V), Some(0xF));
    }

    #[test]
    fn test_unmapped_keys() {
        assert_eq!(keymap(Keycode::Space), None);
        assert_eq!(keymap(Keycode::Num5), None);
        assert_eq!(keymap(Keycode::Escape), None);
    }
}
