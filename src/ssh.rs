use ssh2::{Channel, Session};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::device::{Connector, DeviceError, DeviceSession};
use crate::models::{ConnectionParams, DeviceType};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const QUIET_POLLS: u32 = 5;
const PROMPT_ATTEMPTS: usize = 3;

/// 键盘交互认证时一律回答口令
struct PasswordPrompt {
    password: String,
}

impl ssh2::KeyboardInteractivePrompt for PasswordPrompt {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[ssh2::Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.password.clone()).collect()
    }
}

/// 基于 ssh2 交互式 shell 的连接器
#[derive(Debug, Clone)]
pub struct SshConnector {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl SshConnector {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self { connect_timeout, read_timeout }
    }
}

impl Connector for SshConnector {
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn DeviceSession>, DeviceError> {
        let transport = SshTransport::open(params, self.connect_timeout)?;
        let secret = params.secret.clone().unwrap_or_default();
        let session = CliSession::start(transport, params.device_type, secret, self.read_timeout)?;
        Ok(Box::new(session))
    }
}

/// CLI 会话下层的字节通道，读写均为非阻塞语义（无数据时返回 WouldBlock）
pub trait Transport: Send {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// 对端是否已关闭
    fn eof(&self) -> bool;

    fn close(&mut self) -> Result<(), DeviceError>;
}

/// ssh2 PTY shell 通道
pub struct SshTransport {
    session: Session,
    channel: Channel,
}

impl SshTransport {
    pub fn open(params: &ConnectionParams, connect_timeout: Duration) -> Result<Self, DeviceError> {
        let host = params.host.as_str();
        let port = params.port;
        info!("尝试连接到设备: {}:{} ({})", host, port, params.device_type);

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| DeviceError::ConnectionFailed(format!("无法解析地址 {}: {}", host, e)))?
            .next()
            .ok_or_else(|| DeviceError::ConnectionFailed(format!("无法解析地址 {}", host)))?;

        let tcp = TcpStream::connect_timeout(&addr, connect_timeout).map_err(|e| {
            error!("TCP连接失败到 {}:{} - {}", host, port, e);
            DeviceError::NetworkTimeout { host: host.to_string(), port }
        })?;

        let mut session = Session::new()
            .map_err(|e| DeviceError::ConnectionFailed(format!("创建SSH会话失败: {}", e)))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(connect_timeout.as_millis()).unwrap_or(u32::MAX));

        session.handshake().map_err(|e| {
            error!("SSH握手失败: {}", e);
            DeviceError::HandshakeFailed
        })?;

        authenticate(&session, &params.username, &params.password)?;
        info!("SSH认证成功: {}@{}", params.username, host);

        let mut channel = session
            .channel_session()
            .map_err(|e| DeviceError::ChannelCreationFailed(e.to_string()))?;
        channel
            .request_pty("vt100", None, Some((511, 24, 0, 0)))
            .map_err(|e| DeviceError::ChannelCreationFailed(format!("请求PTY失败: {}", e)))?;
        channel
            .shell()
            .map_err(|e| DeviceError::ChannelCreationFailed(format!("启动Shell失败: {}", e)))?;

        session.set_blocking(false);
        Ok(SshTransport { session, channel })
    }
}

impl Transport for SshTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.channel.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.channel.write(data)
    }

    fn eof(&self) -> bool {
        self.channel.eof()
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.session.set_blocking(true);
        let _ = self.channel.send_eof();
        let _ = self.channel.close();
        self.session
            .disconnect(None, "session closed", None)
            .map_err(|e| DeviceError::ConnectionFailed(format!("断开连接失败: {}", e)))
    }
}

pub struct CliSession<T: Transport> {
    transport: T,
    device_type: DeviceType,
    secret: String,
    base_prompt: String,
    read_timeout: Duration,
    in_config_mode: bool,
}

impl<T: Transport> CliSession<T> {
    /// 在已建立的通道上识别提示符并关闭分页
    pub fn start(
        transport: T,
        device_type: DeviceType,
        secret: String,
        read_timeout: Duration,
    ) -> Result<Self, DeviceError> {
        let mut cli = CliSession {
            transport,
            device_type,
            secret,
            base_prompt: String::new(),
            read_timeout,
            in_config_mode: false,
        };
        cli.prepare()?;
        Ok(cli)
    }

    pub fn base_prompt(&self) -> &str {
        &self.base_prompt
    }

    // 连续两次回车得到相同的提示符才认定，横幅中以 # 结尾的行不会被误认
    fn prepare(&mut self) -> Result<(), DeviceError> {
        let mut previous: Option<String> = None;
        for _ in 0..PROMPT_ATTEMPTS {
            self.write_line("")?;
            let output = self.read_until(|out| find_base_prompt(out).is_some())?;
            let candidate = find_base_prompt(&output);
            if candidate.is_some() && candidate == previous {
                break;
            }
            previous = candidate;
        }

        self.base_prompt =
            previous.ok_or_else(|| DeviceError::PromptTimeout("无法识别设备提示符".to_string()))?;
        debug!("设备提示符: {}", self.base_prompt);
        self.clear_buffer()?;

        self.send_command("terminal width 511")?;
        self.send_command("terminal length 0")?;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), DeviceError> {
        let data = format!("{}\n", line);
        let mut pending = data.as_bytes();
        let deadline = Instant::now() + self.read_timeout;

        while !pending.is_empty() {
            match self.transport.write(pending) {
                Ok(n) => pending = &pending[n..],
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(DeviceError::PromptTimeout(format!("写入超时: {}", line)));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn read_until<F>(&mut self, done: F) -> Result<String, DeviceError>
    where
        F: Fn(&str) -> bool,
    {
        let deadline = Instant::now() + self.read_timeout;
        let mut buffer = [0u8; 4096];
        let mut output = String::new();

        loop {
            match self.transport.read(&mut buffer) {
                Ok(0) if self.transport.eof() => {
                    return Err(DeviceError::ConnectionFailed("设备关闭了通道".to_string()));
                }
                Ok(0) => {}
                Ok(n) => {
                    output.push_str(&String::from_utf8_lossy(&buffer[..n]).replace('\r', ""));
                    if done(&output) {
                        return Ok(output);
                    }
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                warn!("等待提示符超时，已读取 {} 字节", output.len());
                let tail = output.trim_end().rsplit('\n').next().unwrap_or_default();
                return Err(DeviceError::PromptTimeout(tail.to_string()));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    // 丢弃识别提示符期间多出来的回显，直到通道安静下来
    fn clear_buffer(&mut self) -> Result<(), DeviceError> {
        let deadline = Instant::now() + self.read_timeout;
        let mut buffer = [0u8; 4096];
        let mut quiet = 0;

        while quiet < QUIET_POLLS && Instant::now() < deadline {
            match self.transport.read(&mut buffer) {
                Ok(0) if self.transport.eof() => {
                    return Err(DeviceError::ConnectionFailed("设备关闭了通道".to_string()));
                }
                Ok(n) if n > 0 => {
                    quiet = 0;
                    continue;
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
            quiet += 1;
            std::thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }

    fn read_until_prompt(&mut self) -> Result<String, DeviceError> {
        let base = self.base_prompt.clone();
        self.read_until(|out| ends_with_prompt(out, &base))
    }

    fn run_raw(&mut self, line: &str) -> Result<String, DeviceError> {
        self.write_line(line)?;
        self.read_until_prompt()
    }

    fn enter_config_mode(&mut self) -> Result<String, DeviceError> {
        let output = self.run_raw("configure terminal")?;
        self.in_config_mode = true;
        Ok(output)
    }

    fn exit_config_mode(&mut self) -> Result<String, DeviceError> {
        let output = self.run_raw("end")?;
        self.in_config_mode = false;
        Ok(output)
    }
}

impl<T: Transport> DeviceSession for CliSession<T> {
    fn send_command(&mut self, command: &str) -> Result<String, DeviceError> {
        let raw = self.run_raw(command)?;
        Ok(clean_output(&raw, command))
    }

    fn enable(&mut self) -> Result<(), DeviceError> {
        let current = self.run_raw("")?;
        if trailing_line(&current).map_or(false, is_privileged) {
            return Ok(());
        }

        info!("进入特权模式");
        self.write_line("enable")?;
        let base = self.base_prompt.clone();
        let asks_secret = |out: &str| ends_with_prompt(out, &base) || is_password_prompt(out);
        let reply = self.read_until(asks_secret)?;

        let reply = if is_password_prompt(&reply) {
            let secret = self.secret.clone();
            self.write_line(&secret)?;
            self.read_until(asks_secret)?
        } else {
            reply
        };

        // 口令错误时设备会再次询问口令或回到用户模式
        match trailing_line(&reply) {
            Some(line) if ends_with_prompt(&reply, &base) && is_privileged(line) => Ok(()),
            _ => Err(DeviceError::EnableFailed("未能进入特权模式，请检查enable口令".to_string())),
        }
    }

    fn send_config_set(&mut self, lines: &[String]) -> Result<String, DeviceError> {
        let mut output = self.enter_config_mode()?;
        for line in lines {
            output.push_str(&self.run_raw(line)?);
        }
        // XR 需要留在配置模式内等待 commit
        if !self.device_type.commits_in_config_mode() {
            output.push_str(&self.exit_config_mode()?);
        }
        Ok(output)
    }

    fn save_config(&mut self) -> Result<String, DeviceError> {
        let mut output = String::new();
        match self.device_type {
            DeviceType::CiscoXr => {
                if !self.in_config_mode {
                    output.push_str(&self.enter_config_mode()?);
                }
                output.push_str(&self.run_raw(self.device_type.save_command())?);
                output.push_str(&self.exit_config_mode()?);
            }
            DeviceType::CiscoIos => {
                if self.in_config_mode {
                    output.push_str(&self.exit_config_mode()?);
                }
                output.push_str(&self.run_raw(self.device_type.save_command())?);
            }
        }
        Ok(output)
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        if self.in_config_mode {
            let _ = self.exit_config_mode();
        }
        let _ = self.write_line("exit");

        self.transport.close()?;
        info!("SSH会话已关闭");
        Ok(())
    }
}

fn authenticate(session: &Session, username: &str, password: &str) -> Result<(), DeviceError> {
    if session.userauth_password(username, password).is_ok() && session.authenticated() {
        return Ok(());
    }

    // 部分设备只接受键盘交互认证
    let mut prompter = PasswordPrompt { password: password.to_string() };
    let _ = session.userauth_keyboard_interactive(username, &mut prompter);

    if session.authenticated() {
        Ok(())
    } else {
        warn!("SSH认证失败: {}", username);
        Err(DeviceError::AuthenticationFailed)
    }
}

/// 输出末尾尚未换行的那一行；以换行结束的行不可能是提示符
fn trailing_line(output: &str) -> Option<&str> {
    output.rsplit('\n').next().filter(|line| !line.trim().is_empty())
}

fn is_prompt_line(line: &str) -> bool {
    let line = line.trim_end();
    line.ends_with('#') || line.ends_with('>')
}

fn is_privileged(line: &str) -> bool {
    line.trim_end().ends_with('#')
}

fn is_password_prompt(output: &str) -> bool {
    trailing_line(output).map_or(false, |line| line.trim_end().ends_with("assword:"))
}

/// 从末尾提示符中提取主机名部分，去掉模式后缀与结束符
pub fn find_base_prompt(output: &str) -> Option<String> {
    let line = trailing_line(output)?.trim();
    if !is_prompt_line(line) {
        return None;
    }
    let line = &line[..line.len() - 1];
    let base = match line.find('(') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let base = base.trim();
    // 主机名至少包含一个字母或数字，排除 "#####" 这类横幅分隔线
    if base.chars().any(|c| c.is_ascii_alphanumeric()) {
        Some(base.to_string())
    } else {
        None
    }
}

/// 输出是否已经以设备提示符结束（包括配置模式提示符）
pub fn ends_with_prompt(output: &str, base_prompt: &str) -> bool {
    match trailing_line(output) {
        Some(line) => {
            let line = line.trim();
            line.starts_with(base_prompt) && is_prompt_line(line)
        }
        None => false,
    }
}

/// 去掉命令回显行与结尾提示符行
pub fn clean_output(raw: &str, command: &str) -> String {
    let mut lines: Vec<&str> = raw.split('\n').collect();

    if lines.last().map_or(false, |line| line.trim().is_empty() || is_prompt_line(line)) {
        lines.pop();
    }
    if !command.is_empty() && lines.first().map_or(false, |line| line.contains(command)) {
        lines.remove(0);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Mode {
        User,
        Privileged,
        Config,
    }

    /// 内存中的设备 CLI：回显命令，按模式切换提示符，记录收到的每一行
    struct ScriptedDevice {
        hostname: String,
        mode: Mode,
        secret: String,
        awaiting_secret: bool,
        outputs: HashMap<&'static str, &'static str>,
        pending: Vec<u8>,
        input: String,
        // 每次读取只返回一行，模拟逐行到达的数据
        line_reads: bool,
        closed: bool,
        received: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedDevice {
        fn new(hostname: &str, mode: Mode) -> Self {
            let mut device = ScriptedDevice {
                hostname: hostname.to_string(),
                mode,
                secret: "s3cret".to_string(),
                awaiting_secret: false,
                outputs: HashMap::from([
                    ("show clock", "12:00:00.000 UTC Sun Oct 18 2026"),
                    ("show banner motd", "####\nAuthorized access only\n####"),
                ]),
                pending: Vec::new(),
                input: String::new(),
                line_reads: false,
                closed: false,
                received: Arc::new(Mutex::new(Vec::new())),
            };
            let prompt = device.prompt();
            device.pending.extend_from_slice(prompt.as_bytes());
            device
        }

        fn with_banner(mut self, banner: &str) -> Self {
            let mut pending = banner.replace('\n', "\r\n").into_bytes();
            pending.extend_from_slice(&self.pending);
            self.pending = pending;
            self.line_reads = true;
            self
        }

        fn prompt(&self) -> String {
            match self.mode {
                Mode::User => format!("{}>", self.hostname),
                Mode::Privileged => format!("{}#", self.hostname),
                Mode::Config => format!("{}(config)#", self.hostname),
            }
        }

        fn emit(&mut self, text: &str) {
            self.pending.extend_from_slice(text.replace('\n', "\r\n").as_bytes());
        }

        fn handle_line(&mut self, line: &str) {
            self.received.lock().push(line.to_string());

            if self.awaiting_secret {
                self.awaiting_secret = false;
                self.emit("\n");
                if line == self.secret {
                    self.mode = Mode::Privileged;
                    let prompt = self.prompt();
                    self.emit(&prompt);
                } else {
                    self.awaiting_secret = true;
                    self.emit("% Access denied\n\nPassword: ");
                }
                return;
            }

            self.emit(&format!("{}\n", line));
            let body = match (self.mode, line.trim()) {
                (_, "") => String::new(),
                (Mode::User, "enable") => {
                    self.awaiting_secret = true;
                    self.emit("Password: ");
                    return;
                }
                (Mode::Privileged, "configure terminal") => {
                    self.mode = Mode::Config;
                    "Enter configuration commands, one per line.  End with CNTL/Z.\n".to_string()
                }
                (Mode::Privileged, "write memory") => "Building configuration...\n[OK]\n".to_string(),
                (Mode::Config, "end") => {
                    self.mode = Mode::Privileged;
                    String::new()
                }
                (Mode::Config, _) => String::new(),
                (_, "exit") => {
                    self.closed = true;
                    return;
                }
                (_, cmd) if cmd.starts_with("terminal ") => String::new(),
                (_, cmd) => match self.outputs.get(cmd) {
                    Some(out) => format!("{}\n", out),
                    None => "% Invalid input detected at '^' marker.\n".to_string(),
                },
            };
            let prompt = self.prompt();
            self.emit(&format!("{}{}", body, prompt));
        }
    }

    impl Transport for ScriptedDevice {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pending.is_empty() {
                if self.closed {
                    return Ok(0);
                }
                return Err(io::Error::new(ErrorKind::WouldBlock, "no data"));
            }
            let mut n = buf.len().min(self.pending.len());
            if self.line_reads {
                if let Some(pos) = self.pending[..n].iter().position(|b| *b == b'\n') {
                    n = pos + 1;
                }
            }
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }

        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            if self.closed {
                return Err(io::Error::new(ErrorKind::BrokenPipe, "closed"));
            }
            self.input.push_str(&String::from_utf8_lossy(data));
            while let Some(pos) = self.input.find('\n') {
                let line: String = self.input.drain(..=pos).collect();
                self.handle_line(line.trim_end_matches('\n'));
            }
            Ok(data.len())
        }

        fn eof(&self) -> bool {
            self.closed && self.pending.is_empty()
        }

        fn close(&mut self) -> Result<(), DeviceError> {
            self.closed = true;
            Ok(())
        }
    }

    fn start(device: ScriptedDevice, device_type: DeviceType) -> CliSession<ScriptedDevice> {
        CliSession::start(device, device_type, "s3cret".to_string(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_find_base_prompt_xr() {
        let banner = "\nWelcome to the sandbox\n\nRP/0/RP0/CPU0:sandbox-xr#";
        assert_eq!(find_base_prompt(banner).as_deref(), Some("RP/0/RP0/CPU0:sandbox-xr"));
    }

    #[test]
    fn test_find_base_prompt_config_and_user_mode() {
        assert_eq!(find_base_prompt("edge1(config-if)#").as_deref(), Some("edge1"));
        assert_eq!(find_base_prompt("edge1>").as_deref(), Some("edge1"));
        assert_eq!(find_base_prompt("Password:"), None);
        assert_eq!(find_base_prompt(""), None);
    }

    #[test]
    fn test_banner_lines_are_not_prompts() {
        assert_eq!(find_base_prompt("\n##############################\n"), None);
        assert_eq!(find_base_prompt("\n##############################"), None);
        assert_eq!(find_base_prompt("Authorized users only #\n"), None);
        assert_eq!(find_base_prompt("##########\nedge1>").as_deref(), Some("edge1"));
    }

    #[test]
    fn test_ends_with_prompt() {
        assert!(ends_with_prompt("show clock\n12:00:00 UTC\nedge1#", "edge1"));
        assert!(ends_with_prompt("hostname x\nedge1(config)#", "edge1"));
        assert!(!ends_with_prompt("edge1#\n", "edge1"));
        assert!(!ends_with_prompt("show clock\n12:00:00 UTC\n", "edge1"));
        assert!(!ends_with_prompt("other#", "edge1"));
    }

    #[test]
    fn test_clean_output_strips_echo_and_prompt() {
        let raw = "show version\nCisco IOS XR Software, Version 7.3.2\nuptime is 2 days\nRP/0/RP0/CPU0:xr#";
        assert_eq!(
            clean_output(raw, "show version"),
            "Cisco IOS XR Software, Version 7.3.2\nuptime is 2 days"
        );
    }

    #[test]
    fn test_clean_output_without_echo() {
        assert_eq!(clean_output("line one\nedge1#", "show clock"), "line one");
        assert_eq!(clean_output("edge1#", "terminal length 0"), "");
    }

    #[test]
    fn test_start_skips_banner_lines_ending_in_hash() {
        let banner = "##############################\n# Authorized access only #\n##############################\n\n";
        let device = ScriptedDevice::new("edge1", Mode::User).with_banner(banner);
        let received = device.received.clone();

        let cli = start(device, DeviceType::CiscoIos);
        assert_eq!(cli.base_prompt(), "edge1");
        assert_eq!(*received.lock(), vec!["", "", "terminal width 511", "terminal length 0"]);
    }

    #[test]
    fn test_send_command_returns_clean_output() {
        let device = ScriptedDevice::new("edge1", Mode::Privileged).with_banner("");
        let mut cli = start(device, DeviceType::CiscoIos);

        assert_eq!(cli.send_command("show clock").unwrap(), "12:00:00.000 UTC Sun Oct 18 2026");
        // 输出行本身以 # 结尾时不能提前结束读取
        assert_eq!(
            cli.send_command("show banner motd").unwrap(),
            "####\nAuthorized access only\n####"
        );
    }

    #[test]
    fn test_xr_configure_commits_inside_config_mode() {
        let device = ScriptedDevice::new("RP/0/RP0/CPU0:xr1", Mode::Privileged);
        let received = device.received.clone();
        let mut cli = start(device, DeviceType::CiscoXr);

        cli.enable().unwrap();
        let lines = vec!["interface Loopback100".to_string(), " description test".to_string()];
        let output = cli.send_config_set(&lines).unwrap();
        assert!(output.ends_with("RP/0/RP0/CPU0:xr1(config)#"));
        assert!(cli.in_config_mode);

        let saved = cli.save_config().unwrap();
        assert!(saved.starts_with("commit\n"));
        assert!(saved.ends_with("RP/0/RP0/CPU0:xr1#"));
        assert!(!cli.in_config_mode);
        cli.disconnect().unwrap();

        assert_eq!(
            received.lock()[4..],
            [
                "",
                "configure terminal",
                "interface Loopback100",
                " description test",
                "commit",
                "end",
                "exit",
            ]
        );
    }

    #[test]
    fn test_ios_configure_enables_then_writes_memory() {
        let device = ScriptedDevice::new("edge1", Mode::User);
        let received = device.received.clone();
        let mut cli = start(device, DeviceType::CiscoIos);

        cli.enable().unwrap();
        cli.send_config_set(&["ip domain-name lab.local".to_string()]).unwrap();
        assert!(!cli.in_config_mode);

        let saved = cli.save_config().unwrap();
        assert!(saved.contains("[OK]"));
        cli.disconnect().unwrap();

        assert_eq!(
            received.lock()[4..],
            [
                "",
                "enable",
                "s3cret",
                "configure terminal",
                "ip domain-name lab.local",
                "end",
                "write memory",
                "exit",
            ]
        );
    }

    #[test]
    fn test_wrong_enable_secret_fails() {
        let mut device = ScriptedDevice::new("edge1", Mode::User);
        device.secret = "other".to_string();
        let mut cli = start(device, DeviceType::CiscoIos);

        let err = cli.enable().unwrap_err();
        assert!(matches!(err, DeviceError::EnableFailed(_)));
    }

    #[test]
    fn test_disconnect_leaves_config_mode_first() {
        let device = ScriptedDevice::new("edge1", Mode::Privileged);
        let received = device.received.clone();
        let mut cli = start(device, DeviceType::CiscoXr);

        cli.send_config_set(&["hostname edge1".to_string()]).unwrap();
        cli.disconnect().unwrap();

        let received = received.lock();
        assert_eq!(received[received.len() - 2..], ["end", "exit"]);
    }
}
