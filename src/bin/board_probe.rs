use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use nes_boards::debug_flags;
use nes_boards::memory::{Source, SIZE_1K, SIZE_4K};
use nes_boards::savestate::{StateLoader, StateSaver};
use nes_boards::{sram, Board, Cartridge, Cpu, Host, IrqSource, Mirroring, Ppu};

// Board probe: drive a single board without a CPU or PPU attached.
// Usage:
//   cargo run --bin board_probe -- --mapper 56 --prg game.prg --chr game.chr \
//       --write 0xE000=1 --write 0xF000=5 --read 0x8000 --cycles 100000
// Accesses run in command-line order, then the cycle run.

const NTSC_FRAME_CYCLES: u64 = 29_781;

#[derive(Debug)]
enum Op {
    Write(u16, u8),
    Read(u16),
}

#[derive(Debug)]
struct Options {
    mapper: u16,
    prg: PathBuf,
    chr: Option<PathBuf>,
    battery: bool,
    ops: Vec<Op>,
    cycles: u64,
    frame_cycles: u64,
    save_state: Option<PathBuf>,
    load_state: Option<PathBuf>,
}

fn parse_u32_hex_or_dec(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(stripped) = s.strip_prefix("0x").or_else(|| s.strip_prefix('$')) {
        u32::from_str_radix(stripped, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn parse_addr(s: &str) -> Result<u16, String> {
    parse_u32_hex_or_dec(s)
        .and_then(|v| u16::try_from(v).ok())
        .ok_or_else(|| format!("bad address: {s}"))
}

fn parse_args() -> Result<Options, String> {
    let mut args = env::args().skip(1);
    let mut mapper = None;
    let mut prg = None;
    let mut opts = Options {
        mapper: 0,
        prg: PathBuf::new(),
        chr: None,
        battery: false,
        ops: Vec::new(),
        cycles: 0,
        frame_cycles: NTSC_FRAME_CYCLES,
        save_state: None,
        load_state: None,
    };

    while let Some(a) = args.next() {
        let mut value = || args.next().ok_or_else(|| format!("{a} needs a value"));
        match a.as_str() {
            "--mapper" => {
                let v = value()?;
                mapper = Some(v.parse::<u16>().map_err(|_| format!("bad mapper: {v}"))?);
            }
            "--prg" => prg = Some(PathBuf::from(value()?)),
            "--chr" => opts.chr = Some(PathBuf::from(value()?)),
            "--battery" => opts.battery = true,
            "--write" | "-w" => {
                let v = value()?;
                let (addr, data) = v.split_once('=').ok_or_else(|| format!("expected ADDR=VAL, got {v}"))?;
                let data = parse_u32_hex_or_dec(data)
                    .and_then(|d| u8::try_from(d).ok())
                    .ok_or_else(|| format!("bad value: {data}"))?;
                opts.ops.push(Op::Write(parse_addr(addr)?, data));
            }
            "--read" | "-r" => opts.ops.push(Op::Read(parse_addr(&value()?)?)),
            "--cycles" => {
                let v = value()?;
                opts.cycles = v.parse().map_err(|_| format!("bad cycle count: {v}"))?;
            }
            "--frame-cycles" => {
                let v = value()?;
                opts.frame_cycles = v.parse().map_err(|_| format!("bad frame length: {v}"))?;
            }
            "--save-state" => opts.save_state = Some(PathBuf::from(value()?)),
            "--load-state" => opts.load_state = Some(PathBuf::from(value()?)),
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    opts.mapper = mapper.ok_or("--mapper is required")?;
    opts.prg = prg.ok_or("--prg is required")?;
    if opts.frame_cycles == 0 {
        return Err("--frame-cycles must be non-zero".into());
    }
    Ok(opts)
}

#[derive(Default)]
struct ProbeCpu {
    irq: IrqSource,
    irq_edges: u64,
}

impl Cpu for ProbeCpu {
    fn set_irq(&mut self, source: IrqSource, asserted: bool) {
        if asserted && !self.irq.contains(source) {
            self.irq_edges += 1;
        }
        self.irq.set(source, asserted);
    }
}

#[derive(Default)]
struct ProbePpu {
    mirroring: Option<Mirroring>,
    updates: u64,
}

impl Ppu for ProbePpu {
    fn set_mirroring(&mut self, mirroring: Mirroring) {
        if !debug_flags::quiet() {
            println!("  mirroring -> {:?}", mirroring);
        }
        self.mirroring = Some(mirroring);
    }

    fn update(&mut self) {
        self.updates += 1;
    }
}

fn source_tag(source: Option<Source>) -> &'static str {
    match source {
        Some(Source::Prg) => "PRG",
        Some(Source::Chr) => "CHR",
        Some(Source::Wram) => "RAM",
        None => "---",
    }
}

fn print_layout(board: &Board) {
    let banks = board.banks();
    println!("Bank layout ({}):", board.kind());
    let mut line = String::from("  $6000-$7FFF:");
    for window in (0..banks.wrk.span()).step_by(SIZE_4K) {
        let bank = banks.wrk.bank::<SIZE_4K>(window);
        line += &format!(" {}:{:03}", source_tag(banks.wrk.source(window)), bank);
    }
    println!("{line}  (4K units)");

    let mut line = String::from("  $8000-$FFFF:");
    for window in (0..banks.prg.span()).step_by(SIZE_4K) {
        let bank = banks.prg.bank::<SIZE_4K>(window);
        line += &format!(" {}:{:03}", source_tag(banks.prg.source(window)), bank);
    }
    println!("{line}  (4K units)");

    let mut line = String::from("  PPU $0000-$1FFF:");
    for window in (0..banks.chr.span()).step_by(SIZE_1K) {
        line += &format!(" {:03}", banks.chr.bank::<SIZE_1K>(window));
    }
    println!("{line}  (1K units)");
    println!("  mirroring: {:?}", board.mirroring());
}

fn run(opts: Options) -> Result<(), Box<dyn Error>> {
    let cart = Cartridge::load_raw(opts.mapper, &opts.prg, opts.chr.as_deref())?.with_battery(opts.battery);
    let mut board = Board::from_cartridge(&cart)?;
    let mut cpu = ProbeCpu::default();
    let mut ppu = ProbePpu::default();

    board.reset(true, &mut Host::new(&mut cpu, &mut ppu));

    if opts.battery {
        if let Some(data) = sram::load(&opts.prg)? {
            board.load_battery_ram(&data);
        }
    }

    if let Some(path) = &opts.load_state {
        let data = fs::read(path)?;
        let mut loader = StateLoader::new(&data);
        let applied = board.load_state(&mut loader, &mut Host::new(&mut cpu, &mut ppu));
        println!("State {}: {}", path.display(), if applied { "loaded" } else { "not applied" });
    }

    for op in &opts.ops {
        let mut host = Host::new(&mut cpu, &mut ppu);
        match *op {
            Op::Write(addr, data) => {
                let taken = board.poke(addr, data, &mut host);
                println!("W ${:04X} <- ${:02X}{}", addr, data, if taken { "" } else { "  (ignored)" });
            }
            Op::Read(addr) => match board.peek(addr, &mut host) {
                Some(v) => println!("R ${:04X} -> ${:02X}", addr, v),
                None => println!("R ${:04X} -> open bus", addr),
            },
        }
    }

    if opts.cycles > 0 {
        let mut frames = 0u64;
        for cycle in 1..=opts.cycles {
            board.clock(&mut cpu);
            if cycle % opts.frame_cycles == 0 {
                board.vsync();
                frames += 1;
            }
        }
        println!(
            "Ran {} cycles ({} frames): {} IRQ edge(s), line {}",
            opts.cycles,
            frames,
            cpu.irq_edges,
            if cpu.irq.contains(IrqSource::EXTERNAL) { "asserted" } else { "clear" }
        );
    }

    print_layout(&board);
    if let Some(state) = board.irq_state() {
        println!("  irq: {:?}", state);
    }
    println!("  PPU updates: {}", ppu.updates);

    if let Some(path) = &opts.save_state {
        let mut saver = StateSaver::new();
        board.save_state(&mut saver)?;
        let bytes = saver.into_bytes();
        fs::write(path, &bytes)?;
        println!("Saved {} bytes of state to {}", bytes.len(), path.display());
    }

    if let Some(ram) = board.battery_ram() {
        sram::save(&opts.prg, ram)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let level = if debug_flags::quiet() { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let opts = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("board_probe: {e}");
            eprintln!(
                "usage: board_probe --mapper N --prg FILE [--chr FILE] [--battery] \
                 [--write ADDR=VAL]... [--read ADDR]... [--cycles N] [--frame-cycles N] \
                 [--load-state FILE] [--save-state FILE]"
            );
            return ExitCode::from(2);
        }
    };

    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
