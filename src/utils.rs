#[cfg(test)]
pub mod testing {
    use core::fmt;

    use crate::frame::{FrameView, HEIGHT, WIDTH};

    /// A 2-D boolean image of the display, comparable and printable, for
    /// asserting on framebuffer contents in tests.
    #[derive(Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ImageMask([[bool; WIDTH]; HEIGHT]);

    impl ImageMask {
        pub fn new() -> Self {
            Self([[false; WIDTH]; HEIGHT])
        }

        pub fn set(&mut self, x: usize, y: usize) {
            self.0[y][x] = true;
        }
    }

    impl fmt::Debug for ImageMask {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "\n")?;
            for row in &self.0 {
                for &px in row.iter() {
                    write!(f, "{}", if px { '#' } else { '.' })?;
                }
                write!(f, "\n")?;
            }
            Ok(())
        }
    }

    pub trait ToMask {
        fn to_mask(&self) -> ImageMask;
    }

    /// Rows of `#` and `.`, whitespace-separated; missing rows stay unset.
    impl ToMask for str {
        fn to_mask(&self) -> ImageMask {
            let mut mask = ImageMask::new();
            mask.0
                .iter_mut()
                .zip(self.split_whitespace())
                .for_each(|(m_row, c_row)| {
                    m_row
                        .iter_mut()
                        .zip(c_row.chars())
                        .for_each(|(m, c)| *m = c == '#')
                });
            mask
        }
    }

    impl<'a> ToMask for FrameView<'a> {
        fn to_mask(&self) -> ImageMask {
            let mut mask = ImageMask::new();
            self.iter_rows_as_bitslices()
                .zip(mask.0.iter_mut())
                .for_each(|(f_row, m_row)| {
                    m_row.iter_mut().zip(f_row).for_each(|(m, &f)| *m = f)
                });
            mask
        }
    }

    mod tests {
        use super::*;
        use crate::frame::Frame;

        #[test]
        fn str_round_trip() {
            let mut expected = ImageMask::new();
            expected.set(0, 0);
            expected.set(2, 1);

            let mask = "#...\n..#.".to_mask();
            assert_eq!(mask, expected);
        }

        #[test]
        fn frame_to_mask() {
            let mut frame = Frame::new();
            frame.flip(0, 0);
            frame.flip(63, 31);

            let mut expected = ImageMask::new();
            expected.set(0, 0);
            expected.set(63, 31);

            assert_eq!(frame.view().to_mask(), expected);
        }
    }
}
