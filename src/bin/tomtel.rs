use clap::Parser;
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use tomtel_core::{decode, save_snapshot, Memory, Vm};

#[derive(Parser, Debug)]
#[command(
    name = "tomtel",
    about = "Standalone Tomtel Core i69 runner: executes a program image and emits its output stream."
)]
struct Args {
    /// Program image to execute.
    program: PathBuf,

    /// Parse the program as a commented hex listing instead of raw bytes.
    #[arg(long, default_value_t = false)]
    hex: bool,

    /// Write the output stream to this file (defaults to stdout).
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Log every executed instruction to stderr.
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// Maximum instructions to execute (0 = run to HALT).
    #[arg(long, default_value_t = 0)]
    steps: u64,

    /// Dump the final register state as JSON.
    #[arg(long, value_name = "PATH")]
    dump_state: Option<PathBuf>,

    /// Emit a perf summary (instr/sec).
    #[arg(long, default_value_t = false)]
    perf: bool,
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let memory = if args.hex {
        let listing = fs::read_to_string(&args.program)?;
        Memory::from_hex_listing(&listing)?
    } else {
        Memory::new(fs::read(&args.program)?)
    };
    eprintln!(
        "[run] program={} size={} bytes",
        args.program.display(),
        memory.len()
    );

    let mut vm = Vm::with_memory(memory);
    let start = Instant::now();
    while !vm.is_halted() {
        if args.steps != 0 && vm.executed() >= args.steps {
            eprintln!("[run] step budget of {} exhausted before HALT", args.steps);
            break;
        }
        if args.trace {
            let pc = vm.registers().pc();
            match decode(vm.memory(), pc) {
                Ok(instr) => eprintln!("[trace] pc=0x{pc:08X} {instr}"),
                Err(err) => eprintln!("[trace] pc=0x{pc:08X} <{err}>"),
            }
        }
        vm.step()?;
    }
    let elapsed = start.elapsed();

    if vm.is_halted() {
        eprintln!(
            "[halt] executed={} output={} bytes",
            vm.executed(),
            vm.output().len()
        );
    }
    if args.perf {
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 {
            vm.executed() as f64 / secs
        } else {
            0.0
        };
        eprintln!(
            "[perf] executed={} elapsed={secs:.3}s rate={rate:.0} instr/sec",
            vm.executed()
        );
    }
    if let Some(path) = args.dump_state.as_ref() {
        save_snapshot(path, &vm.snapshot())?;
        eprintln!("[state] wrote {}", path.display());
    }
    match args.out.as_ref() {
        Some(path) => fs::write(path, vm.output())?,
        None => std::io::stdout().write_all(vm.output())?,
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
