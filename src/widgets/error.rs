use thiserror::Error;

/// 挂件错误类型
#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("挂件已注册: {name}")]
    AlreadyRegistered {
        name: String,
    },

    #[error("挂件未注册: {name}")]
    NotRegistered {
        name: String,
    },

    #[error("挂件配置无效: {widget} - {message}")]
    InvalidConfig {
        widget: String,
        message: String,
    },

    #[error("占位符不存在: {name}")]
    UnknownPlaceholder {
        name: String,
    },

    #[error("模板不存在: {template}")]
    TemplateNotFound {
        template: String,
    },

    #[error("未知的字段: {field}")]
    UnknownField {
        field: String,
    },

    #[error("渲染挂件失败: {widget} 在占位符 {placeholder} 中出错: {message}")]
    RenderError {
        widget: String,
        placeholder: String,
        message: String,
    },
}
