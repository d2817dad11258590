//! `gwbasic-run`: a thin process entry point around the `gwbasic` library.
//!
//! This binary is deliberately small — the CLI proper (a REPL, line editor,
//! AUTO/RENUM-driven direct mode) is the out-of-scope surface the
//! collaborator traits in `interfaces.rs` stand in for. All this does is
//! parse a program image off disk, wire up a stdio-backed collaborator
//! session, run it, and report an uncaught error the way GW-BASIC itself
//! would at the command prompt.

use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use gwbasic::interfaces::{
    AllMemory, Clock, Collaborators, DeviceOps, EventCommand, EventKind, Events, Files, NullHost,
    Screen, SessionHost, Sound, Stick,
};
use gwbasic::{program, Interpreter};

#[derive(Parser)]
#[command(name = "gwbasic-run", about = "Run a tokenized GW-BASIC program image")]
struct Args {
    /// Path to a tokenized bytecode program image.
    path: String,

    /// OPTION BASE default (0 or 1) before the program's own OPTION BASE runs.
    #[arg(long, default_value_t = 0)]
    base: u8,

    /// Start with tracing on, as if the program opened with TRON.
    #[arg(long)]
    debug: bool,
}

/// Stdio-backed [`Collaborators`]: everything [`NullHost`] already logs is
/// kept as-is, with PRINT output and INPUT prompting redirected to real
/// stdout/stdin instead of an in-memory buffer.
struct StdioHost {
    inner: NullHost,
}

impl StdioHost {
    fn new() -> Self {
        StdioHost { inner: NullHost::new() }
    }
}

impl Screen for StdioHost {
    fn cls(&mut self) {
        print!("\x1b[2J\x1b[H");
        let _ = io::stdout().flush();
    }
    fn locate(&mut self, row: i32, col: i32) {
        self.inner.locate(row, col);
    }
    fn color(&mut self, fg: i32, bg: i32, border: i32) {
        self.inner.color(fg, bg, border);
    }
    fn screen_mode(&mut self, mode: i32, colorswitch: i32, apage: i32, vpage: i32) {
        self.inner.screen_mode(mode, colorswitch, apage, vpage);
    }
    fn width(&mut self, cols: i32, rows: i32) {
        self.inner.width(cols, rows);
    }
    fn print_str(&mut self, s: &str) {
        print!("{s}");
        let _ = io::stdout().flush();
    }
    fn pset(&mut self, x: i32, y: i32, c: i32) {
        self.inner.pset(x, y, c);
    }
    fn preset(&mut self, x: i32, y: i32, c: i32) {
        self.inner.preset(x, y, c);
    }
    fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, c: i32, filled: bool) {
        self.inner.line(x1, y1, x2, y2, c, filled);
    }
    fn circle(&mut self, x: i32, y: i32, r: i32, c: i32) {
        self.inner.circle(x, y, r, c);
    }
    fn paint(&mut self, x: i32, y: i32, c: i32) {
        self.inner.paint(x, y, c);
    }
    fn draw(&mut self, mml: &str) {
        self.inner.draw(mml);
    }
    fn view(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        self.inner.view(x1, y1, x2, y2);
    }
    fn window(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.inner.window(x1, y1, x2, y2);
    }
    fn palette(&mut self, attr: i32, colour: i32) {
        self.inner.palette(attr, colour);
    }
    fn get_image(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, array: &str) {
        self.inner.get_image(x1, y1, x2, y2, array);
    }
    fn put_image(&mut self, x: i32, y: i32, array: &str, action: i32) {
        self.inner.put_image(x, y, array, action);
    }
    fn pcopy(&mut self, src_page: i32, dst_page: i32) {
        self.inner.pcopy(src_page, dst_page);
    }
}

impl Sound for StdioHost {
    fn beep(&mut self) {
        self.inner.beep();
    }
    fn sound(&mut self, freq: f64, duration: f64, volume: i32, voice: i32) {
        self.inner.sound(freq, duration, volume, voice);
    }
    fn noise(&mut self, source: i32, freq: i32, duration: f64) {
        self.inner.noise(source, freq, duration);
    }
    fn play(&mut self, mml: &str) {
        self.inner.play(mml);
    }
}

impl Files for StdioHost {
    fn open(&mut self, name: &str, mode: char, access: char, number: u8, reclen: u16) -> gwbasic::Result<()> {
        self.inner.open(name, mode, access, number, reclen)
    }
    fn close(&mut self, number: Option<u8>) -> gwbasic::Result<()> {
        self.inner.close(number)
    }
    fn field(&mut self, number: u8, layout: &[(u16, String)]) -> gwbasic::Result<()> {
        self.inner.field(number, layout)
    }
    fn print(&mut self, number: u8, s: &str) -> gwbasic::Result<()> {
        self.inner.print(number, s)
    }
    fn write(&mut self, number: u8, fields: &[String]) -> gwbasic::Result<()> {
        self.inner.write(number, fields)
    }
    fn lprint(&mut self, s: &str) {
        self.inner.lprint(s);
    }
    fn get_record(&mut self, number: u8, record: Option<u32>) -> gwbasic::Result<()> {
        self.inner.get_record(number, record)
    }
    fn put_record(&mut self, number: u8, record: Option<u32>) -> gwbasic::Result<()> {
        self.inner.put_record(number, record)
    }
    fn lock(&mut self, number: u8, range: Option<(u32, u32)>) -> gwbasic::Result<()> {
        self.inner.lock(number, range)
    }
    fn unlock(&mut self, number: u8, range: Option<(u32, u32)>) -> gwbasic::Result<()> {
        self.inner.unlock(number, range)
    }
    fn ioctl(&mut self, number: u8, s: &str) -> gwbasic::Result<()> {
        self.inner.ioctl(number, s)
    }
    fn width_file(&mut self, number: u8, cols: i32) {
        self.inner.width_file(number, cols);
    }
}

impl DeviceOps for StdioHost {
    fn name(&mut self, old: &str, new: &str) -> gwbasic::Result<()> {
        self.inner.name(old, new)
    }
    fn kill(&mut self, name: &str) -> gwbasic::Result<()> {
        self.inner.kill(name)
    }
    fn files(&mut self, pattern: &str) -> gwbasic::Result<Vec<String>> {
        self.inner.files(pattern)
    }
    fn chdir(&mut self, path: &str) -> gwbasic::Result<()> {
        self.inner.chdir(path)
    }
    fn mkdir(&mut self, path: &str) -> gwbasic::Result<()> {
        self.inner.mkdir(path)
    }
    fn rmdir(&mut self, path: &str) -> gwbasic::Result<()> {
        self.inner.rmdir(path)
    }
    fn lcopy(&mut self, range: Option<(i32, i32)>) {
        self.inner.lcopy(range);
    }
    fn motor(&mut self, on: bool) {
        self.inner.motor(on);
    }
}

impl AllMemory for StdioHost {
    fn def_seg(&mut self, segment: Option<u32>) {
        self.inner.def_seg(segment);
    }
    fn def_usr(&mut self, slot: u8, address: u32) {
        self.inner.def_usr(slot, address);
    }
    fn poke(&mut self, address: i64, value: u8) -> gwbasic::Result<()> {
        self.inner.poke(address, value)
    }
    fn peek(&mut self, address: i64) -> u8 {
        self.inner.peek(address)
    }
    fn bload(&mut self, filename: &str, offset: Option<u32>) -> gwbasic::Result<()> {
        self.inner.bload(filename, offset)
    }
    fn bsave(&mut self, filename: &str, offset: u32, length: u32) -> gwbasic::Result<()> {
        self.inner.bsave(filename, offset, length)
    }
    fn call(&mut self, slot: u8, args: &[gwbasic::values::Value]) -> gwbasic::Result<()> {
        self.inner.call(slot, args)
    }
}

impl Events for StdioHost {
    fn on_event_gosub(&mut self, token: EventKind, num: Option<i32>, jump: Option<u16>) {
        self.inner.on_event_gosub(token, num, jump);
    }
    fn switch(&mut self, token: EventKind, num: Option<i32>, command: EventCommand) {
        self.inner.switch(token, num, command);
    }
    fn num_fn_keys(&self) -> i32 {
        self.inner.num_fn_keys()
    }
}

impl Clock for StdioHost {
    fn date(&self) -> String {
        self.inner.date()
    }
    fn time(&self) -> String {
        self.inner.time()
    }
    fn set_date(&mut self, s: &str) -> gwbasic::Result<()> {
        self.inner.set_date(s)
    }
    fn set_time(&mut self, s: &str) -> gwbasic::Result<()> {
        self.inner.set_time(s)
    }
}

impl Stick for StdioHost {
    fn strig_statement(&mut self, num: i32, command: EventCommand) {
        self.inner.strig_statement(num, command);
    }
}

impl SessionHost for StdioHost {
    fn run(&mut self, filename: Option<&str>, keep_open_files: bool) {
        self.inner.run(filename, keep_open_files);
    }
    fn load(&mut self, filename: &str, run_after: bool) {
        self.inner.load(filename, run_after);
    }
    fn save(&mut self, filename: &str, mode: Option<char>) {
        self.inner.save(filename, mode);
    }
    fn merge(&mut self, filename: &str) {
        self.inner.merge(filename);
    }
    fn chain(&mut self, filename: &str, merge: bool, all: bool) {
        self.inner.chain(filename, merge, all);
    }
    fn list(&mut self, from: Option<u16>, to: Option<u16>) {
        self.inner.list(from, to);
    }
    fn llist(&mut self, from: Option<u16>, to: Option<u16>) {
        self.inner.llist(from, to);
    }
    fn delete(&mut self, from: Option<u16>, to: Option<u16>) {
        self.inner.delete(from, to);
    }
    fn auto(&mut self, start: Option<u16>, increment: Option<u16>) {
        self.inner.auto(start, increment);
    }
    fn renum(&mut self, new_start: Option<u16>, old_start: Option<u16>, increment: Option<u16>) {
        self.inner.renum(new_start, old_start, increment);
    }
    fn edit(&mut self, line: Option<u16>) {
        self.inner.edit(line);
    }
    fn shell(&mut self, command: Option<&str>) {
        self.inner.shell(command);
    }
    fn system(&mut self) {
        self.inner.system();
    }
    fn term(&mut self) {
        self.inner.term();
    }
    fn input_line(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(_) => None,
        }
    }
}

impl Collaborators for StdioHost {
    fn screen(&mut self) -> &mut dyn Screen {
        self
    }
    fn sound(&mut self) -> &mut dyn Sound {
        self
    }
    fn files(&mut self) -> &mut dyn Files {
        self
    }
    fn devices(&mut self) -> &mut dyn DeviceOps {
        self
    }
    fn all_memory(&mut self) -> &mut dyn AllMemory {
        self
    }
    fn events(&mut self) -> &mut dyn Events {
        self
    }
    fn clock(&mut self) -> &mut dyn Clock {
        self
    }
    fn stick(&mut self) -> &mut dyn Stick {
        self
    }
    fn session(&mut self) -> &mut dyn SessionHost {
        self
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let image = match fs::read(&args.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("gwbasic-run: {}: {e}", args.path);
            return ExitCode::FAILURE;
        }
    };
    let lines = match program::load_image(&image) {
        Ok(lines) => lines,
        Err(e) => {
            eprintln!("gwbasic-run: {}: {e}", args.path);
            return ExitCode::FAILURE;
        }
    };

    let mut interp = Interpreter::new();
    if args.base == 1 {
        if let Err(e) = interp.memory.base_array(1) {
            eprintln!("gwbasic-run: {e}");
            return ExitCode::FAILURE;
        }
    }
    interp.trace_on = args.debug;
    interp.load_program(lines);
    let mut host = StdioHost::new();

    match gwbasic::dispatcher::run(&mut interp, &mut host) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let raised = gwbasic::RaisedError { error: e, line: interp.line_number_at(interp.current) };
            eprintln!("{raised}");
            ExitCode::FAILURE
        }
    }
}
