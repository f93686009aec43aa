use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandsOnError {
    Config(String),
    PortScan(String),
    PortOpen(String),
    PortWrite(String),
    Worker(String),
}

impl HandsOnError {
    /// Short stable code, handy when grepping logs.
    pub fn code(&self) -> &'static str {
        match self {
            HandsOnError::Config(_) => "E001",
            HandsOnError::PortScan(_) => "E002",
            HandsOnError::PortOpen(_) => "E003",
            HandsOnError::PortWrite(_) => "E004",
            HandsOnError::Worker(_) => "E005",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            HandsOnError::Config(_) => "Configuration Error",
            HandsOnError::PortScan(_) => "Port Scan Error",
            HandsOnError::PortOpen(_) => "Port Open Error",
            HandsOnError::PortWrite(_) => "Port Write Error",
            HandsOnError::Worker(_) => "Worker Error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            HandsOnError::Config(msg)
            | HandsOnError::PortScan(msg)
            | HandsOnError::PortOpen(msg)
            | HandsOnError::PortWrite(msg)
            | HandsOnError::Worker(msg) => msg,
        }
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        HandsOnError::Config(msg.into())
    }

    pub fn port_scan<T: Into<String>>(msg: T) -> Self {
        HandsOnError::PortScan(msg.into())
    }

    pub fn port_open<T: Into<String>>(msg: T) -> Self {
        HandsOnError::PortOpen(msg.into())
    }

    pub fn port_write<T: Into<String>>(msg: T) -> Self {
        HandsOnError::PortWrite(msg.into())
    }

    pub fn worker<T: Into<String>>(msg: T) -> Self {
        HandsOnError::Worker(msg.into())
    }
}

impl fmt::Display for HandsOnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code(), self.error_type(), self.message())
    }
}

impl std::error::Error for HandsOnError {}

impl From<::config::ConfigError> for HandsOnError {
    fn from(err: ::config::ConfigError) -> Self {
        HandsOnError::Config(err.to_string())
    }
}

impl From<serialport::Error> for HandsOnError {
    fn from(err: serialport::Error) -> Self {
        HandsOnError::PortOpen(err.to_string())
    }
}

impl From<std::io::Error> for HandsOnError {
    fn from(err: std::io::Error) -> Self {
        HandsOnError::PortWrite(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HandsOnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_code_type_and_message() {
        let err = HandsOnError::port_open("/dev/ttyUSB0: no such device");
        assert_eq!(
            err.to_string(),
            "[E003] Port Open Error: /dev/ttyUSB0: no such device"
        );
    }

    #[test]
    fn io_errors_become_write_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: HandsOnError = io.into();
        assert_eq!(err.code(), "E004");
        assert_eq!(err.message(), "gone");
    }

    #[test]
    fn serialport_errors_become_open_errors() {
        let err: HandsOnError =
            serialport::Error::new(serialport::ErrorKind::NoDevice, "unplugged").into();
        assert!(matches!(err, HandsOnError::PortOpen(ref msg) if msg.contains("unplugged")));
    }
}
