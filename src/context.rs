//! Context for accessing functionalities of the platform `Multi8` runs on.
//!
//! The machine owns no window, speaker, keyboard or random generator; it
//! reaches all of them through this trait, so drivers stay testable and the
//! random source stays seedable.

use crate::frame::FrameView;

/// Trait aggregating platform functionalities
pub trait Context {
    /// Consume the current frame
    ///
    /// Called by `tick_chip` after each executed instruction with a
    /// read-only snapshot view of the framebuffer.
    fn on_frame(&mut self, frame: FrameView<'_>);
    /// Turn sound on
    ///
    /// Called by `tick_timers` while the sound timer is counting down.
    fn sound_on(&mut self);
    /// Turn sound off
    ///
    /// Called by `tick_timers` when the sound timer expires.
    fn sound_off(&mut self);
    /// Get state of each key on the 4x4 keyboard
    ///
    /// Written by the platform's input collector, read by the key-query
    /// and wait-for-key instructions.
    fn get_keys(&mut self) -> &[bool; 16];
    /// Generate a random 8-bit number
    ///
    /// The machine calls this for the random instruction only; implement it
    /// with a seeded generator to make runs reproducible.
    fn gen_random(&mut self) -> u8;
}

#[cfg(test)]
pub mod testing {
    use super::*;

    use nanorand::{rand::pcg64::Pcg64 as Rng, RNG};

    use crate::frame::Frame;

    pub struct TestingContext {
        sound: bool,
        frame: Option<Frame>,
        keys: [bool; 16],
        rng: Rng,
    }

    impl TestingContext {
        pub fn new(seed: u128) -> Self {
            Self {
                sound: false,
                frame: None,
                keys: [false; 16],
                rng: Rng::new_seed(seed),
            }
        }

        pub fn is_sound_on(&self) -> bool {
            self.sound
        }

        pub fn get_frame(&self) -> Option<&Frame> {
            self.frame.as_ref()
        }

        pub fn set_key(&mut self, n: u8) {
            self.keys[n as usize] = true;
        }

        pub fn reset_key(&mut self, n: u8) {
            self.keys[n as usize] = false;
        }
    }

    impl Context for TestingContext {
        fn on_frame(&mut self, frame: FrameView<'_>) {
            self.frame = Some(frame.copy_frame());
        }

        fn sound_on(&mut self) {
            self.sound = true;
        }

        fn sound_off(&mut self) {
            self.sound = false;
        }

        fn get_keys(&mut self) -> &[bool; 16] {
            &self.keys
        }

        fn gen_random(&mut self) -> u8 {
            self.rng.generate::<u8>()
        }
    }

    #[test]
    fn testing_context() {
        let mut ctx = TestingContext::new(0);

        let frame = Frame::new();
        ctx.on_frame(frame.view());
        assert_eq!(ctx.get_frame(), Some(&frame));

        ctx.sound_on();
        assert!(ctx.is_sound_on());

        ctx.sound_off();
        assert!(!ctx.is_sound_on());

        ctx.set_key(0x01);
        ctx.set_key(0x0F);
        assert_eq!(ctx.get_keys().iter().filter(|&&k| k).count(), 2);
        assert_eq!((ctx.keys[0x01], ctx.keys[0x0F]), (true, true));

        ctx.reset_key(0x0F);
        assert_eq!(ctx.get_keys().iter().filter(|&&k| k).count(), 1);
        assert_eq!((ctx.keys[0x01], ctx.keys[0x0F]), (true, false));
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = TestingContext::new(42);
        let mut b = TestingContext::new(42);
        for _ in 0..16 {
            assert_eq!(a.gen_random(), b.gen_random());
        }
    }
}
