use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use symphonia_codec_aacdec::{AacDecoderOptions, BlockDecoder, OutputStatus};
use symphonia_core::errors;

/// Writes bits MSB first.
#[derive(Default)]
struct BitWriter {
    buf: Vec<u8>,
    len: usize,
}

impl BitWriter {
    fn put(&mut self, value: u32, bits: u32) -> &mut Self {
        for i in (0..bits).rev() {
            if self.len % 8 == 0 {
                self.buf.push(0);
            }
            if value & (1 << i) != 0 {
                self.buf[self.len / 8] |= 0x80 >> (self.len % 8);
            }
            self.len += 1;
        }
        self
    }

    /// Terminate the block with an end element and a padding byte.
    fn finish(mut self) -> Vec<u8> {
        self.put(7, 3);
        self.buf.push(0);
        self.buf
    }
}

const ID_SCE: u32 = 0;
const ID_CPE: u32 = 1;
const ID_PCE: u32 = 5;

/// A long window ICS info block.
fn ics_info(bw: &mut BitWriter, max_sfb: u32) {
    // ics_reserved_bit, window_sequence, window_shape, max_sfb, predictor_data_present
    bw.put(0, 1).put(0, 2).put(0, 1).put(max_sfb, 6).put(0, 1);
}

/// A long window ICS where every band is a zero band.
fn zero_ics(bw: &mut BitWriter, max_sfb: u32) {
    bw.put(100, 8);
    ics_info(bw, max_sfb);

    // One section of zero bands.
    let mut left = max_sfb;
    if left > 0 {
        bw.put(0, 4);
        while left >= 31 {
            bw.put(31, 5);
            left -= 31;
        }
        bw.put(left, 5);
    }

    // pulse_data_present, tns_data_present, gain_control_data_present
    bw.put(0, 3);
}

fn sce_block(max_sfb: u32) -> Vec<u8> {
    let mut bw = BitWriter::default();
    bw.put(ID_SCE, 3).put(0, 4);
    zero_ics(&mut bw, max_sfb);
    bw.finish()
}

fn cpe_block() -> BitWriter {
    let mut bw = BitWriter::default();
    bw.put(ID_CPE, 3).put(0, 4);
    // Separate windows.
    bw.put(0, 1);
    zero_ics(&mut bw, 0);
    zero_ics(&mut bw, 0);
    bw
}

fn decoder(sample_rate: u32, channels: usize) -> BlockDecoder<f32> {
    BlockDecoder::from_stream_params(sample_rate, channels, &AacDecoderOptions::default()).unwrap()
}

#[test]
fn default_configuration_channel_counts() {
    for channels in [1, 2, 3, 4, 5, 6, 7, 8] {
        let dec = decoder(48000, channels);
        assert_eq!(dec.output().channels().len(), channels);
        assert_eq!(dec.output().layout().count(), channels);
    }

    // 22.2
    let dec = decoder(48000, 24);
    assert_eq!(dec.output().channels().len(), 24);
}

#[test]
fn mono_silent_block() {
    let mut dec = decoder(48000, 1);

    let frame = dec.decode(&sce_block(0)).unwrap();

    assert_eq!(frame.channels(), 1);
    assert_eq!(frame.frames(), 1024);
    assert!(frame.plane(0).iter().all(|&x| x == 0.0));
}

#[test]
fn max_sfb_limit() {
    // 49 long window bands at 48 kHz.
    let mut dec = decoder(48000, 1);
    assert!(dec.decode(&sce_block(49)).is_ok());

    let mut dec = decoder(48000, 1);
    match dec.decode(&sce_block(50)) {
        Err(errors::Error::DecodeError(_)) => (),
        res => panic!("unexpected result {:?}", res.map(|frame| frame.frames())),
    }
}

#[test]
fn reserved_mid_side_mode() {
    let mut bw = BitWriter::default();
    bw.put(ID_CPE, 3).put(0, 4);
    // Common window, then ms_mask_present = 3.
    bw.put(1, 1);
    ics_info(&mut bw, 0);
    bw.put(3, 2);
    zero_ics(&mut bw, 0);
    zero_ics(&mut bw, 0);

    let mut dec = decoder(44100, 2);
    assert!(dec.decode(&bw.finish()).is_err());

    // The decoder is usable afterwards.
    assert_eq!(dec.decode(&cpe_block().finish()).unwrap().channels(), 2);
}

#[test]
fn program_config_after_lock_is_ignored() {
    let mut dec = decoder(44100, 2);

    assert_eq!(dec.decode(&cpe_block().finish()).unwrap().channels(), 2);
    assert_eq!(dec.output().status(), OutputStatus::Locked);

    // A program config element describing a single front SCE, followed by the stereo pair.
    let mut bw = BitWriter::default();
    bw.put(ID_PCE, 3).put(0, 4);
    bw.put(1, 2).put(4, 4);
    bw.put(1, 4).put(0, 4).put(0, 4).put(0, 2).put(0, 3).put(0, 4);
    bw.put(0, 3);
    bw.put(0, 1).put(0, 4);
    let pad = (8 - bw.len % 8) % 8;
    bw.put(0, pad as u32).put(0, 8);

    bw.put(ID_CPE, 3).put(0, 4).put(0, 1);
    zero_ics(&mut bw, 0);
    zero_ics(&mut bw, 0);

    let frame = dec.decode(&bw.finish()).unwrap();

    assert_eq!(frame.channels(), 2);
    assert_eq!(dec.output().status(), OutputStatus::Locked);
}

#[test]
fn noise_is_reproducible() {
    // One noise band with a noise energy of global_gain - 90.
    let mut bw = BitWriter::default();
    bw.put(ID_SCE, 3).put(0, 4);
    bw.put(100, 8);
    ics_info(&mut bw, 1);
    bw.put(13, 4).put(1, 5);
    bw.put(256, 9);
    bw.put(0, 3);
    let block = bw.finish();

    let mut a = decoder(48000, 1);
    let mut b = decoder(48000, 1);

    let first = a.decode(&block).unwrap().plane(0).to_vec();
    let second = b.decode(&block).unwrap().plane(0).to_vec();

    assert!(first.iter().any(|&x| x != 0.0));
    assert_eq!(first, second);
}

#[test]
fn random_data_does_not_panic() {
    let mut rng = SmallRng::seed_from_u64(0x5eed);

    let mut decoders = vec![decoder(44100, 1), decoder(44100, 2), decoder(48000, 6)];

    let mut buf = [0u8; 256];

    for _ in 0..2000 {
        let len = rng.random_range(1..buf.len());
        rng.fill(&mut buf[..len]);

        for dec in decoders.iter_mut() {
            let _ = dec.decode(&buf[..len]);
        }
    }
}

#[test]
fn invalid_adts_sample_rate() {
    // ADTS header with the reserved sample rate index 13.
    let file = [
        0xff, 0xf1, 0x74, 0x80, 0x2e, 0x7f, 0xfc, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xfb,
        0xaf,
    ];

    let mut dec = decoder(44100, 2);

    match dec.decode(&file) {
        Err(errors::Error::DecodeError(_)) => (),
        res => panic!("unexpected result {:?}", res.map(|frame| frame.frames())),
    }
}
