use std::fs;
use std::process;

use clap::{App, Arg, ArgMatches};
use serde::Serialize;

use usbpipe::usb::{DescriptorKind, EndpDirection, EndpointTy};
use usbpipe::{
    initialize_from_configuration, BindReport, DescriptorTree, DeviceConnection, DriverProfiles,
    Pipe, PipeError, PipeState, Result, DRIVER_PROFILES,
};

#[derive(Serialize)]
struct PipeInfo {
    endpoint_no: u8,
    transfer_type: EndpointTy,
    direction: EndpDirection,
    max_packet_size: usize,
}

#[derive(Serialize)]
struct MappingInfo {
    transfer_type: EndpointTy,
    direction: EndpDirection,
    interface_class: i16,
    present: bool,
    descriptor_offset: Option<usize>,
    interface_offset: Option<usize>,
    pipe: Option<PipeInfo>,
}

#[derive(Serialize)]
struct BindOutput {
    driver: String,
    address: u8,
    report: BindReport,
    mappings: Vec<MappingInfo>,
}

fn walk(matches: &ArgMatches) -> Result<()> {
    let config = fs::read(matches.value_of("FILE").unwrap_or_default())?;

    DescriptorTree::standard(&config).walk(|descriptor, depth| {
        let kind = match DescriptorKind::from_u8(descriptor.kind()) {
            Some(kind) => format!("{:?}", kind),
            None => format!("{:#04x}", descriptor.kind()),
        };
        println!(
            "{:indent$}{} @{} ({} bytes)",
            "",
            kind,
            descriptor.offset(),
            descriptor.length(),
            indent = depth * 2
        );
    });
    Ok(())
}

fn bind(matches: &ArgMatches) -> Result<()> {
    let config = fs::read(matches.value_of("FILE").unwrap_or_default())?;
    let driver = matches.value_of("DRIVER").unwrap_or_default();
    let address = match matches.value_of("ADDRESS") {
        Some(address) => address
            .parse::<u8>()
            .or(Err(PipeError::InvalidArgument("ADDRESS must be an 8-bit integer")))?,
        None => 1,
    };

    let runtime_profiles;
    let profiles: &DriverProfiles = match matches.value_of("PROFILES") {
        Some(path) => {
            runtime_profiles = DriverProfiles::from_slice(&fs::read(path)?)?;
            &runtime_profiles
        }
        None => &*DRIVER_PROFILES,
    };
    let profile = profiles.find(driver).ok_or(PipeError::NotFound)?;

    let mut pipes: Vec<Pipe> = profile.endpoints.iter().map(|_| Pipe::default()).collect();
    let mut mappings = profile.mappings(&mut pipes);

    let connection = DeviceConnection::new(0, address);
    let report = initialize_from_configuration(&mut mappings, &config, &connection)?;

    let mappings = mappings
        .iter()
        .map(|mapping| MappingInfo {
            transfer_type: mapping.description.transfer_type,
            direction: mapping.description.direction,
            interface_class: mapping.description.interface_class,
            present: mapping.present,
            descriptor_offset: mapping.descriptor.map(|descriptor| descriptor.offset()),
            interface_offset: mapping.interface.map(|interface| interface.offset()),
            pipe: mapping
                .pipe
                .as_deref()
                .filter(|pipe| pipe.state() != PipeState::Uninitialized)
                .map(|pipe| PipeInfo {
                    endpoint_no: pipe.endpoint_no,
                    transfer_type: pipe.transfer_type,
                    direction: pipe.direction,
                    max_packet_size: pipe.max_packet_size,
                }),
        })
        .collect();

    let output = BindOutput {
        driver: driver.to_owned(),
        address,
        report,
        mappings,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() {
    let file = Arg::with_name("FILE")
        .help("Raw configuration descriptor")
        .takes_value(true)
        .required(true);

    let matches = App::new("usbpipectl")
        .arg(
            Arg::with_name("VERBOSE")
                .short("v")
                .long("verbose")
                .multiple(true),
        )
        .subcommand(App::new("walk").arg(file.clone()))
        .subcommand(
            App::new("bind")
                .arg(file)
                .arg(
                    Arg::with_name("DRIVER")
                        .takes_value(true)
                        .required(true)
                        .long("driver")
                        .short("d"),
                )
                .arg(
                    Arg::with_name("PROFILES")
                        .help("Endpoint profiles to use instead of the built-in ones")
                        .takes_value(true)
                        .long("profiles")
                        .short("p"),
                )
                .arg(
                    Arg::with_name("ADDRESS")
                        .takes_value(true)
                        .long("address")
                        .short("a"),
                ),
        )
        .get_matches();

    common::setup_logging(
        "usb",
        "tool",
        "usbpipectl",
        common::verbosity_level(matches.occurrences_of("VERBOSE")),
        common::file_level(),
    );

    let result = match matches.subcommand() {
        ("walk", Some(walk_matches)) => walk(walk_matches),
        ("bind", Some(bind_matches)) => bind(bind_matches),
        _ => {
            eprintln!("{}", matches.usage());
            process::exit(1);
        }
    };

    if let Err(err) = result {
        log::error!("{}", err);
        let errno = syscall::Error::from(err).errno;
        process::exit(errno);
    }
}
