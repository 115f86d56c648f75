// 表单输入拆分
// 抓取与页面回显共用同一套拆分规则

/// 命令字符串：逗号或换行分隔，去除首尾空白，丢弃空项
pub fn split_commands(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .replace('\n', ",")
        .split(',')
        .map(str::trim)
        .filter(|cmd| !cmd.is_empty())
        .map(str::to_string)
        .collect()
}

/// 目标主机列表：逗号分隔
pub fn split_hosts(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect()
}

/// 配置块只按行拆分，配置行本身可能包含逗号
pub fn split_config_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
