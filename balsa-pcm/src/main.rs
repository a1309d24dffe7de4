use std::process::ExitCode;
use std::str::FromStr;

use structopt::StructOpt;

use balsa_core::constraints::Constraints;
use balsa_core::Direction;
use balsa_device::{Address, Monitor, ProfileType, StreamDirection};
use balsa_pcm::config;

#[derive(StructOpt)]
enum Opt {
    /// Open a playback or capture stream against a remote transport and
    /// print hw_ptr/io_ptr progress until interrupted.
    Stream(StreamOpt),
    /// Watch a daemon interface's transports come and go.
    Monitor(MonitorOpt),
}

#[derive(StructOpt)]
struct StreamOpt {
    #[structopt(long)]
    interface: String,
    #[structopt(long)]
    address: String,
    #[structopt(long, default_value = "a2dp")]
    profile: String,
    #[structopt(long)]
    capture: bool,
    #[structopt(long, default_value = "480")]
    period_size: u64,
    #[structopt(long, default_value = "4")]
    periods: u32,
    #[structopt(long, default_value = "48000")]
    rate: u32,
    #[structopt(long, default_value = "2")]
    channels: u16,
}

#[derive(StructOpt)]
struct MonitorOpt {
    #[structopt(long)]
    interface: String,
    #[structopt(long)]
    address: String,
    #[structopt(long, default_value = "a2dp")]
    profile: String,
}

#[derive(Debug)]
pub enum RunError {
    Core(balsa_core::CoreError),
    Device(balsa_device::DeviceError),
    Address(balsa_protocol::ProfileParseError),
}

impl From<balsa_core::CoreError> for RunError {
    fn from(e: balsa_core::CoreError) -> Self {
        RunError::Core(e)
    }
}

impl From<balsa_device::DeviceError> for RunError {
    fn from(e: balsa_device::DeviceError) -> Self {
        RunError::Device(e)
    }
}

fn main() -> Result<(), ExitCode> {
    env_logger::init();

    if let Some(config) = config::read() {
        config::load_into_env(&config);
    }

    let opt = Opt::from_args();

    let result = match opt {
        Opt::Stream(opt) => run_stream(opt),
        Opt::Monitor(opt) => run_monitor(opt),
    };

    result.map_err(|err| {
        eprintln!("error: {err:?}");
        ExitCode::FAILURE
    })
}

fn run_stream(opt: StreamOpt) -> Result<(), RunError> {
    let direction = if opt.capture { Direction::Capture } else { Direction::Playback };
    let profile = ProfileType::from_str(&opt.profile).map_err(RunError::Address)?;
    let address = Address::from_str(&opt.address).map_err(RunError::Address)?;
    let stream_direction = match direction {
        Direction::Capture => StreamDirection::Capture,
        Direction::Playback => StreamDirection::Playback,
    };

    let constraints = Constraints::for_transport(opt.channels, opt.rate);
    let buffer_size = opt.period_size * opt.periods as u64;
    let frame_size = constraints.frame_size();
    let mut storage = vec![0u8; buffer_size as usize * frame_size].into_boxed_slice();
    let base = storage.as_mut_ptr();

    let host = unsafe { balsa_pcm::PluginHost::new(base, 0, frame_size * 8, buffer_size) };
    host.set_appl_ptr(buffer_size);

    let handle = balsa_pcm::open(direction, constraints, host)?;
    balsa_pcm::with_stream(handle, |s| s.hw_params(opt.period_size, opt.periods)).unwrap()?;
    balsa_pcm::with_stream(handle, |s| s.prepare()).unwrap()?;
    balsa_pcm::with_stream(handle, |s| s.start()).unwrap()?;

    balsa_pcm::set_remote_device(handle, &opt.interface, address, profile, stream_direction)?;

    println!("streaming; press ctrl-c to stop");
    loop {
        std::thread::sleep(std::time::Duration::from_secs(1));
        let dump = balsa_pcm::with_stream(handle, |s| s.dump()).unwrap_or_default();
        println!("{dump}");
    }
}

fn run_monitor(opt: MonitorOpt) -> Result<(), RunError> {
    let profile = ProfileType::from_str(&opt.profile).map_err(RunError::Address)?;
    let address = Address::from_str(&opt.address).map_err(RunError::Address)?;

    let monitor = Monitor::open(&opt.interface)?;
    monitor.set_device(address, profile, StreamDirection::Duplex)?;

    println!("watching {} for {}/{:?}", opt.interface, opt.address, profile);
    loop {
        std::thread::sleep(std::time::Duration::from_millis(500));
        if let Some(transport) = monitor.current_transport() {
            println!("attached: {:?}", transport);
        } else {
            println!("no matching transport");
        }
    }
}
