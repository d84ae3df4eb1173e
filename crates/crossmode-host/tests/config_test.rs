//! Configuration surface tests.

use std::io::Write;

use crossmode_host::Config;

#[test]
fn full_file_parses() {
    let yaml = r#"
daemon: true
log:
    filePath: /var/log/crossmode
    fileRoot: crossmode
    fileLevel: 1
    displayLevel: 2
system:
    timeout: 120
    identity: TCD-1
    twoWayTranscode: true
    verbose: true
    debug: false
    gainAdjust: 3.0
    info:
        latitude: 41.25
        longitude: -95.93
        height: 12
        power: 25
        location: "Somewhere, USA"
srcNetwork:
    address: 10.0.0.1
    port: 62031
    local: 42000
    id: 312000
    password: s3cret
    talkgroupHang: 360
    slot1: true
    slot2: false
    debug: false
dstNetwork:
    address: 10.0.0.2
    port: 62032
    id: 312001
    password: other
network:
    jitter: 500
"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let config = Config::load(file.path()).unwrap();
    assert!(config.daemon);
    assert_eq!(config.log.file_path, "/var/log/crossmode");
    assert_eq!(config.log.display_level, 2);
    assert_eq!(config.system.timeout, 120);
    assert_eq!(config.system.identity, "TCD-1");
    assert!(config.system.two_way_transcode);
    assert!((config.system.gain_adjust - 3.0).abs() < f32::EPSILON);
    assert!((config.system.info.latitude - 41.25).abs() < f32::EPSILON);
    assert_eq!(config.system.info.location, "Somewhere, USA");
    assert_eq!(config.src_network.address, "10.0.0.1");
    assert_eq!(config.src_network.local, 42000);
    assert!(!config.src_network.slot2);
    assert_eq!(config.dst_network.port, 62032);
    assert_eq!(config.dst_network.password, "other");
    assert_eq!(config.network.jitter, 500);
}

#[test]
fn defaults_fill_missing_sections() {
    let yaml = r#"
srcNetwork:
    address: 10.0.0.1
    id: 1
    password: a
dstNetwork:
    address: 10.0.0.2
    id: 2
    password: b
"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let config = Config::load(file.path()).unwrap();
    assert!(!config.daemon);
    assert_eq!(config.system.timeout, 180);
    assert!(config.system.verbose);
    assert!(!config.system.two_way_transcode);
    assert_eq!(config.src_network.port, 62031);
    assert!(config.src_network.slot1);
    assert!(config.src_network.slot2);
    assert_eq!(config.network.jitter, 360);
    assert_eq!(config.log.display_level, 2);
}

#[test]
fn missing_file_is_fatal() {
    let result = Config::load(std::path::Path::new("/nonexistent/crossmode.yml"));
    assert!(result.is_err());
}

#[test]
fn malformed_yaml_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"system: [not, a, mapping\n").unwrap();
    assert!(Config::load(file.path()).is_err());
}
