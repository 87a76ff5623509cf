use super::*;
use crate::cartridge::Cartridge;
use crate::host::IrqSource;
use crate::testing::{cartridge, TestHost};

fn board(mapper: u16, prg_kb: usize, chr_kb: usize, th: &mut TestHost) -> Board {
    let mut board = Board::from_cartridge(&cartridge(mapper, prg_kb, chr_kb)).unwrap();
    board.reset(true, &mut th.host());
    board
}

fn save(board: &Board) -> Vec<u8> {
    let mut saver = StateSaver::new();
    board.save_state(&mut saver).unwrap();
    saver.into_bytes()
}

#[test]
fn test_mapper_numbers_round_trip() {
    for kind in BoardKind::ALL {
        assert_eq!(BoardKind::from_mapper(kind.mapper()), Some(kind));
    }
    assert_eq!(BoardKind::from_mapper(4), None);
}

#[test]
fn test_family_ids_are_distinct() {
    for (i, a) in BoardKind::ALL.iter().enumerate() {
        assert_eq!(a.family_id().version(), 0);
        for b in &BoardKind::ALL[i + 1..] {
            assert_ne!(a.family_id(), b.family_id(), "{a} vs {b}");
        }
    }
}

#[test]
fn test_construction_errors() {
    let err = Board::from_cartridge(&cartridge(4, 32, 8)).err();
    assert!(matches!(err, Some(BoardError::UnsupportedMapper(4))));

    let empty = Cartridge::new(56, Vec::new().into());
    assert!(matches!(Board::from_cartridge(&empty).err(), Some(BoardError::MissingPrg)));
}

#[test]
fn test_unclaimed_addresses_fall_through() {
    let mut th = TestHost::default();
    let mut b = board(171, 32, 32, &mut th);
    // No work RAM on this board: open bus.
    assert_eq!(b.peek(0x6000, &mut th.host()), None);
    assert_eq!(b.peek(0x4020, &mut th.host()), None);
    assert_eq!(b.peek(0x8400, &mut th.host()), Some(1));
    assert!(!b.poke(0x8000, 0xFF, &mut th.host()));
    assert!(!b.poke(0x5000, 0xFF, &mut th.host()));
}

#[test]
fn test_mirroring_is_forwarded_once_per_value() {
    let mut th = TestHost::default();
    let mut b = board(56, 128, 128, &mut th);
    assert_eq!(th.ppu.mirroring, vec![Mirroring::Horizontal]);

    b.poke(0xF800, 0x01, &mut th.host());
    b.poke(0xF800, 0x01, &mut th.host());
    b.poke(0xF800, 0x03, &mut th.host());
    b.poke(0xF800, 0x00, &mut th.host());
    b.poke(0xF800, 0x00, &mut th.host());

    assert_eq!(
        th.ppu.mirroring,
        vec![Mirroring::Horizontal, Mirroring::Vertical, Mirroring::Horizontal]
    );
    assert_eq!(b.mirroring(), Mirroring::Horizontal);
}

#[test]
fn test_reset_replaces_bindings() {
    let mut th = TestHost::default();
    for (mapper, expected) in [(56, 8), (142, 9), (171, 32), (175, 3), (307, 1)] {
        let mut b = board(mapper, 128, 0, &mut th);
        assert_eq!(b.bindings(), expected, "mapper {mapper}");
        b.reset(false, &mut th.host());
        b.reset(false, &mut th.host());
        assert_eq!(b.bindings(), expected, "mapper {mapper} after soft reset");
    }
}

/// A few writes that leave every variant in a non-power-on state.
fn scramble(b: &mut Board, th: &mut TestHost) {
    for (addr, data) in [
        (0x8000, 0x0E),
        (0x8001, 0x05),
        (0x9000, 0x07),
        (0xA000, 0x03),
        (0xB002, 0x09),
        (0xC000, 0x01),
        (0xD001, 0x02),
        (0xE000, 0x02),
        (0xF000, 0x06),
        (0xF0A0, 0x03),
        (0xFC02, 0x0B),
        (0xF800, 0x01),
        (0x6010, 0x5A),
    ] {
        b.poke(addr, data, &mut th.host());
    }
    b.peek(0xFFFC, &mut th.host());
    for _ in 0..100 {
        b.clock(&mut th.cpu);
    }
}

#[test]
fn test_save_load_save_is_identical() {
    for kind in BoardKind::ALL {
        let mut th = TestHost::default();
        let cart = cartridge(kind.mapper(), 256, 128);
        let mut original = Board::new(kind, &cart).unwrap();
        original.reset(true, &mut th.host());
        scramble(&mut original, &mut th);
        let bytes = save(&original);

        let mut restored = Board::new(kind, &cart).unwrap();
        restored.reset(true, &mut th.host());
        let mut loader = StateLoader::new(&bytes);
        assert!(restored.load_state(&mut loader, &mut th.host()), "{kind}");
        assert_eq!(save(&restored), bytes, "{kind}");
        assert_eq!(loader.begin().unwrap(), None);

        for addr in (0x6000..=0xFFFFu16).step_by(0x400) {
            assert_eq!(
                restored.peek(addr, &mut th.host()),
                original.peek(addr, &mut th.host()),
                "{kind} at {addr:04X}"
            );
        }
    }
}

#[test]
fn test_unknown_inner_chunk_is_skipped() {
    let mut th = TestHost::default();
    let mut source = board(56, 128, 128, &mut th);
    source.poke(0xE000, 0x03, &mut th.host());
    let current = save(&source);

    // Splice an unknown chunk in front of the known ones.
    let mut saver = StateSaver::new();
    saver.begin(BoardKind::Ks202.family_id());
    saver.begin(ChunkId::new(*b"NEW", 3)).write(&[0xDE, 0xAD, 0xBE, 0xEF]).end();
    saver.write(&current[8..]);
    saver.end();
    let bytes = saver.into_bytes();

    let mut target = board(56, 128, 128, &mut th);
    assert!(target.load_state(&mut StateLoader::new(&bytes), &mut th.host()));
    assert_eq!(save(&target), current);
}

#[test]
fn test_unknown_chunk_after_known_ones_is_skipped() {
    let mut th = TestHost::default();
    let mut source = board(56, 128, 128, &mut th);
    source.poke(0xE000, 0x04, &mut th.host());
    source.poke(0xF000, 0x09, &mut th.host());
    let current = save(&source);

    let mut saver = StateSaver::new();
    saver.begin(BoardKind::Ks202.family_id());
    saver.write(&current[8..]);
    saver.begin(ChunkId::new(*b"ZZZ", 1)).write32(0x1234_5678).end();
    saver.end();
    let bytes = saver.into_bytes();

    let mut target = board(56, 128, 128, &mut th);
    let mut loader = StateLoader::new(&bytes);
    assert!(target.load_state(&mut loader, &mut th.host()));
    assert_eq!(save(&target), current);
    assert_eq!(loader.begin().unwrap(), None);
}

#[test]
fn test_small_wram_override_repeats() {
    let mut th = TestHost::default();
    let cart = cartridge(56, 128, 128).with_wram_size(0x200);
    let mut b = Board::from_cartridge(&cart).unwrap();
    b.reset(true, &mut th.host());
    assert!(b.poke(0x6100, 0x42, &mut th.host()));
    assert_eq!(b.peek(0x6300, &mut th.host()), Some(0x42));

    let prg: Vec<u8> = (0..0x600).map(|i| (i >> 8) as u8).collect();
    let mut odd = Board::from_cartridge(&Cartridge::new(171, prg.into())).unwrap();
    odd.reset(true, &mut th.host());
    assert_eq!(odd.peek(0x8700, &mut th.host()), Some(0x01));
    assert_eq!(odd.peek(0x8500, &mut th.host()), Some(0x05));
    assert_eq!(odd.peek(0xFFFF, &mut th.host()), Some(0x01));
}

#[test]
fn test_foreign_family_is_ignored() {
    let mut th = TestHost::default();
    let mut other = board(171, 32, 32, &mut th);
    other.poke(0xF000, 0x02, &mut th.host());
    let foreign = save(&other);

    let mut b = board(56, 128, 128, &mut th);
    let before = save(&b);
    let mut loader = StateLoader::new(&foreign);
    assert!(!b.load_state(&mut loader, &mut th.host()));
    assert_eq!(save(&b), before);
    assert_eq!(loader.begin().unwrap(), None);
}

#[test]
fn test_corrupt_state_rolls_back() {
    let mut th = TestHost::default();
    let mut b = board(56, 128, 128, &mut th);
    b.poke(0xE000, 0x02, &mut th.host());
    let before = save(&b);

    // Valid REG chunk followed by a truncated IRQ block.
    let mut saver = StateSaver::new();
    saver.begin(BoardKind::Ks202.family_id());
    saver.begin(ChunkId::new(*b"REG", 0)).write8(0x0F).end();
    saver.begin(ChunkId::new(*b"IRQ", 0)).write(&[0x01, 0x02]).end();
    saver.end();
    let bytes = saver.into_bytes();

    let mut loader = StateLoader::new(&bytes);
    assert!(!b.load_state(&mut loader, &mut th.host()));
    assert_eq!(save(&b), before);
    assert_eq!(loader.depth(), 0);
}

#[test]
fn test_overrunning_chunk_rolls_back() {
    let mut th = TestHost::default();
    let mut b = board(305, 64, 0, &mut th);
    b.poke(0x8000, 0x03, &mut th.host());
    let before = save(&b);

    let mut bytes = before.clone();
    // Length of the first inner chunk, right after the family header.
    bytes[15] = 0x7F;
    assert!(!b.load_state(&mut StateLoader::new(&bytes), &mut th.host()));
    assert_eq!(save(&b), before);
}

#[test]
fn test_load_reasserts_pending_irq() {
    let mut th = TestHost::default();
    let mut b = board(56, 128, 128, &mut th);
    for (addr, data) in [(0x8000, 0xF), (0x9000, 0xF), (0xA000, 0xF), (0xB000, 0xF), (0xC000, 0x1)] {
        b.poke(addr, data, &mut th.host());
    }
    b.clock(&mut th.cpu);
    assert_eq!(b.irq_state(), Some(IrqState::Pending));
    let bytes = save(&b);

    let mut th2 = TestHost::default();
    let mut fresh = board(56, 128, 128, &mut th2);
    assert!(fresh.load_state(&mut StateLoader::new(&bytes), &mut th2.host()));
    assert_eq!(fresh.irq_state(), Some(IrqState::Pending));
    assert!(th2.cpu.line());
    assert_eq!(th2.cpu.edges.last(), Some(&(IrqSource::EXTERNAL, true)));
}

#[test]
fn test_battery_ram_requires_battery() {
    let mut th = TestHost::default();
    let plain = board(56, 128, 128, &mut th);
    assert!(plain.battery_ram().is_none());

    let cart = cartridge(56, 128, 128).with_battery(true);
    let mut b = Board::from_cartridge(&cart).unwrap();
    b.reset(true, &mut th.host());
    assert!(b.poke(0x6123, 0x77, &mut th.host()));
    let ram = b.battery_ram().unwrap().to_vec();
    assert_eq!(ram.len(), 0x2000);
    assert_eq!(ram[0x123], 0x77);

    let mut other = Board::from_cartridge(&cart).unwrap();
    other.reset(true, &mut th.host());
    assert!(other.load_battery_ram(&ram));
    assert_eq!(other.peek(0x6123, &mut th.host()), Some(0x77));
}

#[test]
fn test_battery_ram_short_image_loads_prefix() {
    let mut th = TestHost::default();
    let cart = cartridge(307, 128, 0).with_battery(true);
    let mut b = Board::from_cartridge(&cart).unwrap();
    b.reset(true, &mut th.host());
    assert!(b.load_battery_ram(&[1, 2, 3]));
    assert_eq!(b.peek(0x6002, &mut th.host()), Some(3));
    assert_eq!(b.peek(0x6003, &mut th.host()), Some(0));
}
