//! Collaborator traits: the narrow interfaces the core calls into but does
//! not implement itself (screen, sound, files, devices, all-memory, events,
//! clock, stick).
//!
//! One small trait per attached peripheral, invoked by address/operation
//! rather than owned outright. `statements.rs` holds a
//! `&mut dyn Collaborators` and calls through it; it never matches on
//! which concrete backend is plugged in.

use crate::error::Result;
use crate::values::Value;

/// `screen.{pset_,preset_,line_,circle_,paint_,get_,put_,draw_,locate_,
/// color_,palette_,view_,window_,view_print_,screen_,pcopy_,cls_}`
pub trait Screen {
    fn cls(&mut self);
    fn locate(&mut self, row: i32, col: i32);
    fn color(&mut self, fg: i32, bg: i32, border: i32);
    fn screen_mode(&mut self, mode: i32, colorswitch: i32, apage: i32, vpage: i32);
    fn width(&mut self, cols: i32, rows: i32);
    fn print_str(&mut self, s: &str);
    fn pset(&mut self, x: i32, y: i32, c: i32);
    fn preset(&mut self, x: i32, y: i32, c: i32);
    fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, c: i32, filled: bool);
    fn circle(&mut self, x: i32, y: i32, r: i32, c: i32);
    fn paint(&mut self, x: i32, y: i32, c: i32);
    fn draw(&mut self, mml: &str);
    fn view(&mut self, x1: i32, y1: i32, x2: i32, y2: i32);
    fn window(&mut self, x1: f64, y1: f64, x2: f64, y2: f64);
    fn palette(&mut self, attr: i32, colour: i32);
    fn get_image(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, array: &str);
    fn put_image(&mut self, x: i32, y: i32, array: &str, action: i32);
    fn pcopy(&mut self, src_page: i32, dst_page: i32);
}

/// `sound.{sound_,noise_,beep_,play_}`
pub trait Sound {
    fn beep(&mut self);
    fn sound(&mut self, freq: f64, duration: f64, volume: i32, voice: i32);
    fn noise(&mut self, source: i32, freq: i32, duration: f64);
    fn play(&mut self, mml: &str);
}

/// `files.{open_,close_,field_,print_,write_,lprint_,get_,put_,lock_,
/// unlock_,ioctl_,reset_,width_}`
pub trait Files {
    fn open(&mut self, name: &str, mode: char, access: char, number: u8, reclen: u16) -> Result<()>;
    fn close(&mut self, number: Option<u8>) -> Result<()>;
    fn field(&mut self, number: u8, layout: &[(u16, String)]) -> Result<()>;
    fn print(&mut self, number: u8, s: &str) -> Result<()>;
    fn write(&mut self, number: u8, fields: &[String]) -> Result<()>;
    fn lprint(&mut self, s: &str);
    fn get_record(&mut self, number: u8, record: Option<u32>) -> Result<()>;
    fn put_record(&mut self, number: u8, record: Option<u32>) -> Result<()>;
    fn lock(&mut self, number: u8, range: Option<(u32, u32)>) -> Result<()>;
    fn unlock(&mut self, number: u8, range: Option<(u32, u32)>) -> Result<()>;
    fn ioctl(&mut self, number: u8, s: &str) -> Result<()>;
    fn width_file(&mut self, number: u8, cols: i32);
}

/// `devices.{name_,kill_,files_,chdir_,mkdir_,rmdir_,lcopy_,motor_}`
pub trait DeviceOps {
    fn name(&mut self, old: &str, new: &str) -> Result<()>;
    fn kill(&mut self, name: &str) -> Result<()>;
    fn files(&mut self, pattern: &str) -> Result<Vec<String>>;
    fn chdir(&mut self, path: &str) -> Result<()>;
    fn mkdir(&mut self, path: &str) -> Result<()>;
    fn rmdir(&mut self, path: &str) -> Result<()>;
    fn lcopy(&mut self, range: Option<(i32, i32)>);
    fn motor(&mut self, on: bool);
}

/// `all_memory.{poke_,bload_,bsave_,def_seg_,def_usr_,call_}`
pub trait AllMemory {
    fn def_seg(&mut self, segment: Option<u32>);
    fn def_usr(&mut self, slot: u8, address: u32);
    fn poke(&mut self, address: i64, value: u8) -> Result<()>;
    fn peek(&mut self, address: i64) -> u8;
    fn bload(&mut self, filename: &str, offset: Option<u32>) -> Result<()>;
    fn bsave(&mut self, filename: &str, offset: u32, length: u32) -> Result<()>;
    fn call(&mut self, slot: u8, args: &[Value]) -> Result<()>;
}

/// `events.{on_event_gosub_,com_,pen_,timer_,play_,strig_,key_}`
pub trait Events {
    fn on_event_gosub(&mut self, token: EventKind, num: Option<i32>, jump: Option<u16>);
    fn switch(&mut self, token: EventKind, num: Option<i32>, command: EventCommand);
    fn num_fn_keys(&self) -> i32;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Key,
    Pen,
    Timer,
    Play,
    Com,
    Strig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventCommand {
    On,
    Off,
    Stop,
}

/// `clock.{date_,time_}`
pub trait Clock {
    fn date(&self) -> String;
    fn time(&self) -> String;
    fn set_date(&mut self, s: &str) -> Result<()>;
    fn set_time(&mut self, s: &str) -> Result<()>;
}

/// `stick.strig_statement_`
pub trait Stick {
    fn strig_statement(&mut self, num: i32, command: EventCommand);
}

/// `session.{new_,run_,load_,save_,merge_,chain_,clear_,delete_,auto_,
/// renum_,edit_,list_,llist_,shell_,system_,term_,randomize_,error_,end_,
/// common_,input_,input_file_,line_input_}`. `new_`/`clear_`/`common_` are
/// `Interpreter` methods (session.rs) rather than collaborator hooks, since
/// they mutate the owned `Memory`/control-flow state directly; this trait
/// carries only the pieces that reach outside that state — program-source
/// management (RUN/LOAD/SAVE/MERGE/CHAIN/DELETE/AUTO/RENUM/EDIT/LIST/LLIST)
/// and process control (SHELL/SYSTEM/TERM) — plus the line-editor's
/// INPUT/LINE INPUT prompt readback.
pub trait SessionHost {
    fn run(&mut self, filename: Option<&str>, keep_open_files: bool);
    fn load(&mut self, filename: &str, run_after: bool);
    fn save(&mut self, filename: &str, mode: Option<char>);
    fn merge(&mut self, filename: &str);
    fn chain(&mut self, filename: &str, merge: bool, all: bool);
    fn list(&mut self, from: Option<u16>, to: Option<u16>);
    fn llist(&mut self, from: Option<u16>, to: Option<u16>);
    fn delete(&mut self, from: Option<u16>, to: Option<u16>);
    fn auto(&mut self, start: Option<u16>, increment: Option<u16>);
    fn renum(&mut self, new_start: Option<u16>, old_start: Option<u16>, increment: Option<u16>);
    fn edit(&mut self, line: Option<u16>);
    fn shell(&mut self, command: Option<&str>);
    fn system(&mut self);
    fn term(&mut self);
    fn input_line(&mut self, prompt: &str) -> Option<String>;
}

/// Bundles every collaborator the dispatcher and per-statement parsers
/// call through, so `Interpreter` needs only one trait-object field
/// instead of eight.
pub trait Collaborators {
    fn screen(&mut self) -> &mut dyn Screen;
    fn sound(&mut self) -> &mut dyn Sound;
    fn files(&mut self) -> &mut dyn Files;
    fn devices(&mut self) -> &mut dyn DeviceOps;
    fn all_memory(&mut self) -> &mut dyn AllMemory;
    fn events(&mut self) -> &mut dyn Events;
    fn clock(&mut self) -> &mut dyn Clock;
    fn stick(&mut self) -> &mut dyn Stick;
    fn session(&mut self) -> &mut dyn SessionHost;
}

/// A do-nothing-but-log backend for every collaborator trait, used by
/// tests and by the `gwbasic-run` binary when no richer backend is wired
/// up: every peripheral trait gets a trivial stand-in implementation.
#[derive(Default)]
pub struct NullHost {
    pub printed: Vec<String>,
    date: String,
    time: String,
}

impl NullHost {
    pub fn new() -> Self {
        NullHost { printed: Vec::new(), date: "01-01-1980".into(), time: "00:00:00".into() }
    }
}

impl Screen for NullHost {
    fn cls(&mut self) {
        log::trace!("CLS");
    }
    fn locate(&mut self, row: i32, col: i32) {
        log::trace!("LOCATE {row},{col}");
    }
    fn color(&mut self, fg: i32, bg: i32, border: i32) {
        log::trace!("COLOR {fg},{bg},{border}");
    }
    fn screen_mode(&mut self, mode: i32, colorswitch: i32, apage: i32, vpage: i32) {
        log::trace!("SCREEN {mode},{colorswitch},{apage},{vpage}");
    }
    fn width(&mut self, cols: i32, rows: i32) {
        log::trace!("WIDTH {cols},{rows}");
    }
    fn print_str(&mut self, s: &str) {
        self.printed.push(s.to_string());
    }
    fn pset(&mut self, x: i32, y: i32, c: i32) {
        log::trace!("PSET ({x},{y}),{c}");
    }
    fn preset(&mut self, x: i32, y: i32, c: i32) {
        log::trace!("PRESET ({x},{y}),{c}");
    }
    fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, c: i32, filled: bool) {
        log::trace!("LINE ({x1},{y1})-({x2},{y2}),{c},{filled}");
    }
    fn circle(&mut self, x: i32, y: i32, r: i32, c: i32) {
        log::trace!("CIRCLE ({x},{y}),{r},{c}");
    }
    fn paint(&mut self, x: i32, y: i32, c: i32) {
        log::trace!("PAINT ({x},{y}),{c}");
    }
    fn draw(&mut self, mml: &str) {
        log::trace!("DRAW {mml}");
    }
    fn view(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        log::trace!("VIEW ({x1},{y1})-({x2},{y2})");
    }
    fn window(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        log::trace!("WINDOW ({x1},{y1})-({x2},{y2})");
    }
    fn palette(&mut self, attr: i32, colour: i32) {
        log::trace!("PALETTE {attr},{colour}");
    }
    fn get_image(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, array: &str) {
        log::trace!("GET ({x1},{y1})-({x2},{y2}), {array}");
    }
    fn put_image(&mut self, x: i32, y: i32, array: &str, action: i32) {
        log::trace!("PUT ({x},{y}), {array}, {action}");
    }
    fn pcopy(&mut self, src_page: i32, dst_page: i32) {
        log::trace!("PCOPY {src_page},{dst_page}");
    }
}

impl Sound for NullHost {
    fn beep(&mut self) {
        log::trace!("BEEP");
    }
    fn sound(&mut self, freq: f64, duration: f64, volume: i32, voice: i32) {
        log::trace!("SOUND {freq},{duration},{volume},{voice}");
    }
    fn noise(&mut self, source: i32, freq: i32, duration: f64) {
        log::trace!("NOISE {source},{freq},{duration}");
    }
    fn play(&mut self, mml: &str) {
        log::trace!("PLAY {mml}");
    }
}

impl Files for NullHost {
    fn open(&mut self, name: &str, mode: char, access: char, number: u8, reclen: u16) -> Result<()> {
        log::trace!("OPEN {name} mode={mode} access={access} #{number} len={reclen}");
        Ok(())
    }
    fn close(&mut self, number: Option<u8>) -> Result<()> {
        log::trace!("CLOSE {number:?}");
        Ok(())
    }
    fn field(&mut self, number: u8, layout: &[(u16, String)]) -> Result<()> {
        log::trace!("FIELD #{number}, {layout:?}");
        Ok(())
    }
    fn print(&mut self, number: u8, s: &str) -> Result<()> {
        log::trace!("PRINT #{number}, {s}");
        Ok(())
    }
    fn write(&mut self, number: u8, fields: &[String]) -> Result<()> {
        log::trace!("WRITE #{number}, {fields:?}");
        Ok(())
    }
    fn lprint(&mut self, s: &str) {
        log::trace!("LPRINT {s}");
    }
    fn get_record(&mut self, number: u8, record: Option<u32>) -> Result<()> {
        log::trace!("GET #{number}, {record:?}");
        Ok(())
    }
    fn put_record(&mut self, number: u8, record: Option<u32>) -> Result<()> {
        log::trace!("PUT #{number}, {record:?}");
        Ok(())
    }
    fn lock(&mut self, number: u8, range: Option<(u32, u32)>) -> Result<()> {
        log::trace!("LOCK #{number}, {range:?}");
        Ok(())
    }
    fn unlock(&mut self, number: u8, range: Option<(u32, u32)>) -> Result<()> {
        log::trace!("UNLOCK #{number}, {range:?}");
        Ok(())
    }
    fn ioctl(&mut self, number: u8, s: &str) -> Result<()> {
        log::trace!("IOCTL #{number}, {s}");
        Ok(())
    }
    fn width_file(&mut self, number: u8, cols: i32) {
        log::trace!("WIDTH #{number}, {cols}");
    }
}

impl DeviceOps for NullHost {
    fn name(&mut self, old: &str, new: &str) -> Result<()> {
        log::trace!("NAME {old} AS {new}");
        Ok(())
    }
    fn kill(&mut self, name: &str) -> Result<()> {
        log::trace!("KILL {name}");
        Ok(())
    }
    fn files(&mut self, pattern: &str) -> Result<Vec<String>> {
        log::trace!("FILES {pattern}");
        Ok(Vec::new())
    }
    fn chdir(&mut self, path: &str) -> Result<()> {
        log::trace!("CHDIR {path}");
        Ok(())
    }
    fn mkdir(&mut self, path: &str) -> Result<()> {
        log::trace!("MKDIR {path}");
        Ok(())
    }
    fn rmdir(&mut self, path: &str) -> Result<()> {
        log::trace!("RMDIR {path}");
        Ok(())
    }
    fn lcopy(&mut self, range: Option<(i32, i32)>) {
        log::trace!("LCOPY {range:?}");
    }
    fn motor(&mut self, on: bool) {
        log::trace!("MOTOR {on}");
    }
}

impl AllMemory for NullHost {
    fn def_seg(&mut self, segment: Option<u32>) {
        log::trace!("DEF SEG = {segment:?}");
    }
    fn def_usr(&mut self, slot: u8, address: u32) {
        log::trace!("DEF USR{slot} = {address}");
    }
    fn poke(&mut self, address: i64, value: u8) -> Result<()> {
        log::trace!("POKE {address}, {value}");
        Ok(())
    }
    fn peek(&mut self, address: i64) -> u8 {
        log::trace!("PEEK {address}");
        0
    }
    fn bload(&mut self, filename: &str, offset: Option<u32>) -> Result<()> {
        log::trace!("BLOAD {filename}, {offset:?}");
        Ok(())
    }
    fn bsave(&mut self, filename: &str, offset: u32, length: u32) -> Result<()> {
        log::trace!("BSAVE {filename}, {offset}, {length}");
        Ok(())
    }
    fn call(&mut self, slot: u8, args: &[Value]) -> Result<()> {
        log::trace!("CALL {slot}, {} args", args.len());
        Ok(())
    }
}

impl Events for NullHost {
    fn on_event_gosub(&mut self, token: EventKind, num: Option<i32>, jump: Option<u16>) {
        log::trace!("ON {token:?}({num:?}) GOSUB {jump:?}");
    }
    fn switch(&mut self, token: EventKind, num: Option<i32>, command: EventCommand) {
        log::trace!("{token:?}({num:?}) {command:?}");
    }
    fn num_fn_keys(&self) -> i32 {
        10
    }
}

impl Clock for NullHost {
    fn date(&self) -> String {
        self.date.clone()
    }
    fn time(&self) -> String {
        self.time.clone()
    }
    fn set_date(&mut self, s: &str) -> Result<()> {
        self.date = s.to_string();
        Ok(())
    }
    fn set_time(&mut self, s: &str) -> Result<()> {
        self.time = s.to_string();
        Ok(())
    }
}

impl Stick for NullHost {
    fn strig_statement(&mut self, num: i32, command: EventCommand) {
        log::trace!("STRIG({num}) {command:?}");
    }
}

impl SessionHost for NullHost {
    fn run(&mut self, filename: Option<&str>, keep_open_files: bool) {
        log::trace!("RUN {filename:?} keep_open_files={keep_open_files}");
    }
    fn load(&mut self, filename: &str, run_after: bool) {
        log::trace!("LOAD {filename} run_after={run_after}");
    }
    fn save(&mut self, filename: &str, mode: Option<char>) {
        log::trace!("SAVE {filename} {mode:?}");
    }
    fn merge(&mut self, filename: &str) {
        log::trace!("MERGE {filename}");
    }
    fn chain(&mut self, filename: &str, merge: bool, all: bool) {
        log::trace!("CHAIN {filename} merge={merge} all={all}");
    }
    fn list(&mut self, from: Option<u16>, to: Option<u16>) {
        log::trace!("LIST {from:?}-{to:?}");
    }
    fn llist(&mut self, from: Option<u16>, to: Option<u16>) {
        log::trace!("LLIST {from:?}-{to:?}");
    }
    fn delete(&mut self, from: Option<u16>, to: Option<u16>) {
        log::trace!("DELETE {from:?}-{to:?}");
    }
    fn auto(&mut self, start: Option<u16>, increment: Option<u16>) {
        log::trace!("AUTO {start:?},{increment:?}");
    }
    fn renum(&mut self, new_start: Option<u16>, old_start: Option<u16>, increment: Option<u16>) {
        log::trace!("RENUM {new_start:?},{old_start:?},{increment:?}");
    }
    fn edit(&mut self, line: Option<u16>) {
        log::trace!("EDIT {line:?}");
    }
    fn shell(&mut self, command: Option<&str>) {
        log::trace!("SHELL {command:?}");
    }
    fn system(&mut self) {
        log::trace!("SYSTEM");
    }
    fn term(&mut self) {
        log::trace!("TERM");
    }
    fn input_line(&mut self, _prompt: &str) -> Option<String> {
        None
    }
}

impl Collaborators for NullHost {
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
