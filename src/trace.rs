//! Lightweight performance tracing.
//!
//! A [`PerfLogger`] hands out named events that record start, stop and
//! occurrence timestamps while the logger is enabled. The collected data
//! is serialized as one record per line:
//!
//! ```text
//! SPEED <ticks per second>
//! TIME <ticks per second>
//! NAM <type> <id> <name>
//! STA <type> <id> <ticks>
//! STO <type> <id> <ticks>
//! OCC 7 <id> <ticks>
//! DSC <0|1> <id> <value>
//! DNM <type> <id> <name>
//! END
//! ```
//!
//! Ticks are nanoseconds since the logger was last enabled.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::{Result, UtilsError};

const TICKS_PER_SECOND: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Task,
    Interrupt,
    Semaphore,
    Queue,
    Message,
    ValueCount,
    CycleCount,
    Note,
}

impl EventType {
    pub fn code(self) -> u32 {
        match self {
            EventType::Task => 0,
            EventType::Interrupt => 1,
            EventType::Semaphore => 2,
            EventType::Queue => 3,
            EventType::Message => 4,
            EventType::ValueCount => 5,
            EventType::CycleCount => 6,
            EventType::Note => 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Description {
    Text(String),
    Number(f64),
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Description::Text(text) => write!(f, "{}", text),
            Description::Number(number) => write!(f, "{:.6}", number),
        }
    }
}

#[derive(Debug, Clone)]
enum Record {
    Start(Instant),
    Stop(Instant),
    Occurrence(Instant),
    Description { id: u32, value: Description },
    DisplayName { id: u32, name: String },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ticks(time: Instant, start: Instant) -> u128 {
    time.saturating_duration_since(start).as_nanos()
}

#[derive(Debug)]
struct EventData {
    event_type: EventType,
    id: u32,
    name: String,
    records: Mutex<Vec<Record>>,
}

impl EventData {
    fn serialize(&self, start: Instant, out: &mut Vec<String>) {
        let code = self.event_type.code();
        out.push(format!("NAM {} {} {}", code, self.id, self.name));

        for record in lock(&self.records).iter() {
            out.push(match record {
                Record::Start(time) => {
                    format!("STA {} {} {}", code, self.id, ticks(*time, start))
                }
                Record::Stop(time) => {
                    format!("STO {} {} {}", code, self.id, ticks(*time, start))
                }
                Record::Occurrence(time) => format!(
                    "OCC {} {} {}",
                    EventType::Note.code(),
                    self.id,
                    ticks(*time, start)
                ),
                Record::Description { id, value } => {
                    format!("DSC {} {} {}", value.kind(), id, value)
                }
                Record::DisplayName { id, name } => {
                    format!("DNM {} {} {}", code, id, name)
                }
            });
        }
    }
}

impl Description {
    fn kind(&self) -> u32 {
        match self {
            Description::Text(_) => 0,
            Description::Number(_) => 1,
        }
    }
}

#[derive(Debug)]
struct LoggerState {
    enabled: AtomicBool,
    next_id: AtomicU32,
    next_note_id: AtomicU32,
    start: Mutex<Instant>,
    events: Mutex<Vec<Arc<EventData>>>,
}

impl Default for LoggerState {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            next_id: AtomicU32::new(0),
            next_note_id: AtomicU32::new(0),
            start: Mutex::new(Instant::now()),
            events: Mutex::new(Vec::new()),
        }
    }
}

/// Cloneable handle to a shared performance log.
///
/// Events keep recording into the log they were created from, so a single
/// logger is usually created at startup and passed to the components that
/// want to be traced.
#[derive(Debug, Clone, Default)]
pub struct PerfLogger {
    state: Arc<LoggerState>,
}

impl PerfLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording. Data recorded earlier is discarded and timestamps
    /// restart from zero.
    pub fn enable(&self) {
        for event in lock(&self.state.events).iter() {
            lock(&event.records).clear();
        }
        *lock(&self.state.start) = Instant::now();
        self.state.enabled.store(true, Ordering::SeqCst);
        log::debug!("Performance tracing enabled");
    }

    pub fn disable(&self) {
        self.state.enabled.store(false, Ordering::SeqCst);
        log::debug!("Performance tracing disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    pub fn create_event(&self, event_type: EventType, name: &str) -> PerfEvent {
        let data = Arc::new(EventData {
            event_type,
            id: self.state.next_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_owned(),
            records: Mutex::new(Vec::new()),
        });
        lock(&self.state.events).push(data.clone());

        PerfEvent {
            logger: self.state.clone(),
            data,
        }
    }

    pub fn create_task(&self, name: &str) -> PerfEvent {
        self.create_event(EventType::Task, name)
    }

    pub fn create_interrupt(&self, name: &str) -> PerfEvent {
        self.create_event(EventType::Interrupt, name)
    }

    pub fn create_queue(&self, name: &str) -> QueueEvent {
        QueueEvent {
            event: self.create_event(EventType::Queue, name),
        }
    }

    pub fn create_note(&self, name: &str) -> NoteEvent {
        NoteEvent {
            event: self.create_event(EventType::Note, name),
        }
    }

    pub fn perf_data(&self) -> Vec<String> {
        let start = *lock(&self.state.start);

        let mut data = vec![
            format!("SPEED {}", TICKS_PER_SECOND),
            format!("TIME {}", TICKS_PER_SECOND),
        ];
        for event in lock(&self.state.events).iter() {
            event.serialize(start, &mut data);
        }
        data.push("END".to_owned());
        data
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let to_error = || UtilsError::fs("Failed to write trace file", path);

        let mut writer =
            BufWriter::new(File::create(path).map_err(to_error())?);
        for line in self.perf_data() {
            writeln!(writer, "{}", line).map_err(to_error())?;
        }
        writer.flush().map_err(to_error())?;

        log::debug!("Wrote performance trace to {}", path.display());
        Ok(())
    }
}

/// A named event of a [`PerfLogger`]
#[derive(Debug, Clone)]
pub struct PerfEvent {
    logger: Arc<LoggerState>,
    data: Arc<EventData>,
}

impl PerfEvent {
    pub fn id(&self) -> u32 {
        self.data.id
    }

    pub fn event_type(&self) -> EventType {
        self.data.event_type
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn start(&self) {
        self.record(|| Record::Start(Instant::now()));
    }

    pub fn stop(&self) {
        self.record(|| Record::Stop(Instant::now()));
    }

    /// Forget everything recorded for this event
    pub fn reset(&self) {
        lock(&self.data.records).clear();
    }

    fn record(&self, record: impl FnOnce() -> Record) {
        if self.logger.enabled.load(Ordering::SeqCst) {
            lock(&self.data.records).push(record());
        }
    }
}

/// Event tracking items passing through a queue
#[derive(Debug, Clone)]
pub struct QueueEvent {
    event: PerfEvent,
}

impl QueueEvent {
    pub fn item_added(&self) {
        self.event.start();
    }

    pub fn item_removed(&self) {
        self.event.stop();
    }

    pub fn event(&self) -> &PerfEvent {
        &self.event
    }
}

/// Event annotating the trace with free-form notes and values
#[derive(Debug, Clone)]
pub struct NoteEvent {
    event: PerfEvent,
}

impl NoteEvent {
    pub fn add_note(&self, description: &str) {
        self.add_description(
            Description::Text(description.to_owned()),
            "Info",
        );
    }

    pub fn add_value(&self, value: f64) {
        self.add_description(Description::Number(value), "Value");
    }

    pub fn event(&self) -> &PerfEvent {
        &self.event
    }

    fn add_description(&self, value: Description, display_name: &str) {
        if !self.event.logger.enabled.load(Ordering::SeqCst) {
            return;
        }

        let id = self
            .event
            .logger
            .next_note_id
            .fetch_add(1, Ordering::SeqCst);
        let mut records = lock(&self.event.data.records);
        records.push(Record::Occurrence(Instant::now()));
        records.push(Record::Description { id, value });
        records.push(Record::DisplayName {
            id,
            name: display_name.to_owned(),
        });
    }
}

/// Starts an event when created and stops it when dropped
#[must_use = "the event is stopped as soon as the guard is dropped"]
pub struct ScopedPerfTrace {
    event: PerfEvent,
}

impl ScopedPerfTrace {
    pub fn new(event: &PerfEvent) -> Self {
        event.start();
        Self {
            event: event.clone(),
        }
    }
}

impl Drop for ScopedPerfTrace {
    fn drop(&mut self) {
        self.event.stop();
    }
}

/// Reduce a qualified function path to its last two segments, e.g.
/// `crate::module::Type::method` becomes `Type::method`. An argument list
/// is dropped.
pub fn method_name(full_name: &str) -> &str {
    let name = match full_name.find('(') {
        Some(pos) => &full_name[..pos],
        None => full_name,
    };
    let name = name.trim_end();

    match name.rmatch_indices("::").nth(1) {
        Some((pos, _)) => &name[pos + 2..],
        None => name,
    }
}

/// Qualified path of the enclosing function
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        name.strip_suffix("::f").unwrap_or(name)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempdir::TempDir;

    struct Tracer {
        logger: PerfLogger,
        _lifetime: ScopedPerfTrace,
    }

    impl Tracer {
        fn new(logger: &PerfLogger) -> Self {
            let event = logger.create_task("TestTracer");
            Self {
                logger: logger.clone(),
                _lifetime: ScopedPerfTrace::new(&event),
            }
        }

        fn traced(&self, event_type: EventType, name: &str) {
            let event = self.logger.create_event(event_type, method_name(name));
            let _trace = ScopedPerfTrace::new(&event);
        }

        fn m1(&self) {
            self.traced(EventType::Task, crate::function_name!());
        }

        fn interrupt(&self) {
            self.traced(EventType::Interrupt, crate::function_name!());
        }
    }

    fn fields(line: &str) -> Vec<&str> {
        line.split(' ').collect()
    }

    #[test]
    fn perform_trace() {
        crate::initialize();
        let dir = TempDir::new("trace").unwrap();
        let path = dir.path().join("trace.tdi");

        let logger = PerfLogger::new();
        logger.enable();
        {
            let tracer = Tracer::new(&logger);
            tracer.m1();
            tracer.interrupt();
        }
        logger.disable();
        logger.write_to_file(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2 + 3 * 3 + 1);
        assert_eq!(lines[0], "SPEED 1000000000");
        assert_eq!(lines[1], "TIME 1000000000");
        assert_eq!(lines[2], "NAM 0 0 TestTracer");
        assert_eq!(lines[5], "NAM 0 1 Tracer::m1");
        assert_eq!(lines[8], "NAM 1 2 Tracer::interrupt");
        assert_eq!(*lines.last().unwrap(), "END");

        let start = fields(lines[3]);
        let stop = fields(lines[4]);
        assert_eq!(&start[..3], ["STA", "0", "0"]);
        assert_eq!(&stop[..3], ["STO", "0", "0"]);
        let started: u128 = start[3].parse().unwrap();
        let stopped: u128 = stop[3].parse().unwrap();
        assert!(started <= stopped);

        assert_eq!(&fields(lines[9])[..3], ["STA", "1", "2"]);
    }

    #[test]
    fn nothing_recorded_while_disabled() {
        let logger = PerfLogger::new();
        let task = logger.create_task("idle");
        task.start();
        task.stop();

        assert!(!logger.is_enabled());
        assert_eq!(
            logger.perf_data(),
            vec![
                "SPEED 1000000000",
                "TIME 1000000000",
                "NAM 0 0 idle",
                "END"
            ]
        );
    }

    #[test]
    fn enable_resets_recorded_data() {
        let logger = PerfLogger::new();
        let task = logger.create_task("task");

        logger.enable();
        task.start();
        task.stop();
        assert_eq!(logger.perf_data().len(), 6);

        logger.enable();
        assert_eq!(logger.perf_data().len(), 4);

        task.start();
        task.reset();
        assert_eq!(logger.perf_data().len(), 4);
    }

    #[test]
    fn queue_events() {
        let logger = PerfLogger::new();
        logger.enable();
        let queue = logger.create_queue("jobs");
        queue.item_added();
        queue.item_added();
        queue.item_removed();

        let data = logger.perf_data();
        assert_eq!(data[2], "NAM 3 0 jobs");
        assert!(data[3].starts_with("STA 3 0 "));
        assert!(data[4].starts_with("STA 3 0 "));
        assert!(data[5].starts_with("STO 3 0 "));
        assert_eq!(queue.event().event_type(), EventType::Queue);
    }

    #[test]
    fn notes() {
        let logger = PerfLogger::new();
        logger.enable();
        let note = logger.create_note("notes");
        note.add_note("first");
        note.add_value(2.5);

        let data = logger.perf_data();
        assert_eq!(data[2], "NAM 7 0 notes");
        assert!(data[3].starts_with("OCC 7 0 "));
        assert_eq!(data[4], "DSC 0 0 first");
        assert_eq!(data[5], "DNM 7 0 Info");
        assert!(data[6].starts_with("OCC 7 0 "));
        assert_eq!(data[7], "DSC 1 1 2.500000");
        assert_eq!(data[8], "DNM 7 1 Value");
        assert_eq!(data[9], "END");
    }

    #[test]
    fn event_ids_are_unique() {
        let logger = PerfLogger::new();
        let first = logger.create_task("a");
        logger.enable();
        let second = logger.create_interrupt("b");

        assert_eq!(first.id(), 0);
        assert_eq!(second.id(), 1);
        assert_eq!(second.name(), "b");
    }

    #[rstest]
    #[case("utilkit::trace::Tracer::m1", "Tracer::m1")]
    #[case("Tracer::m1", "Tracer::m1")]
    #[case("void ns::Class::method(int, char)", "Class::method")]
    #[case("free_function", "free_function")]
    fn method_names(#[case] full: &str, #[case] expected: &str) {
        assert_eq!(method_name(full), expected);
    }

    #[test]
    fn function_name_of_enclosing_function() {
        let name = crate::function_name!();
        assert!(name.ends_with("tests::function_name_of_enclosing_function"));
    }

    #[test]
    fn writing_to_missing_directory_fails() {
        let dir = TempDir::new("trace").unwrap();
        let logger = PerfLogger::new();
        let result = logger.write_to_file(dir.path().join("no/such/trace.tdi"));
        assert!(matches!(result, Err(UtilsError::Fs { .. })));
    }
}
