use std::sync::Arc;

use dmg_core::bus::{BasicBus, Bus};
use dmg_core::config::RunnerConfig;
use dmg_core::cpu::{ExecError, Interpreter, Processor, TimingTable, CB_PREFIX};
use dmg_core::debug::Disassembler;

fn main() {
    let mut config = RunnerConfig::load();

    let args: Vec<String> = std::env::args().collect();
    let mut rom_path: Option<&str> = None;
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--trace" => config.trace = true,
            "--steps" => match iter.next().and_then(|v| v.parse().ok()) {
                Some(n) => config.max_steps = n,
                None => usage(&args[0]),
            },
            "--cycles" => match iter.next() {
                Some(path) => config.cycles_path = Some(path.clone()),
                None => usage(&args[0]),
            },
            path if rom_path.is_none() => rom_path = Some(path),
            _ => usage(&args[0]),
        }
    }
    let rom_path = rom_path.unwrap_or_else(|| usage(&args[0]));

    if config.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .init();
    }

    let timing = match &config.cycles_path {
        Some(path) => TimingTable::from_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading cycle tables: {}", e);
            std::process::exit(1);
        }),
        None => TimingTable::dmg(),
    };

    let interpreter = Interpreter::dmg().unwrap_or_else(|e| {
        eprintln!("Error building instruction tables: {}", e);
        std::process::exit(1);
    });
    let disasm = Disassembler::dmg().unwrap_or_else(|e| {
        eprintln!("Error building mnemonic tables: {}", e);
        std::process::exit(1);
    });

    let rom = std::fs::read(rom_path).unwrap_or_else(|e| {
        eprintln!("Error loading ROM {}: {}", rom_path, e);
        std::process::exit(1);
    });

    let mut bus = BasicBus::new();
    bus.load(0x0000, &rom);

    let mut proc = Processor::post_boot(bus, Arc::new(interpreter), timing);
    proc.registers.pc = config.start_pc;

    for _ in 0..config.max_steps {
        if config.trace {
            print_instruction(&proc, &disasm);
        }
        match proc.step() {
            Ok(_) => {}
            Err(e @ ExecError::Unimplemented { .. }) => {
                eprintln!("Stopped: {}", e);
                break;
            }
            Err(e) => {
                eprintln!("Execution failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let r = &proc.registers;
    println!(
        "AF={:04X} BC={:04X} DE={:04X} HL={:04X} SP={:04X} PC={:04X} cycles={}",
        r.af(),
        r.bc(),
        r.de(),
        r.hl(),
        r.sp,
        r.pc,
        proc.cycles()
    );
}

fn print_instruction(proc: &Processor<BasicBus>, disasm: &Disassembler) {
    let pc = proc.registers.pc;
    let mut opcode = proc.bus().read_byte(pc);
    let table = if opcode == CB_PREFIX {
        opcode = proc.bus().read_byte(pc.wrapping_add(1));
        1
    } else {
        0
    };
    match disasm.name(opcode, table) {
        Ok(name) => println!("{:04X}  {}", pc, name),
        Err(e) => println!("{:04X}  ?? ({})", pc, e),
    }
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [--trace] [--steps N] [--cycles FILE] <rom.gb>", program);
    std::process::exit(1);
}
