//! 对象读写命令

use crate::connection::ConnectionArgs;
use anyhow::{Context, Result};
use clap::Args;
use hdrive_sdk::ObjectRef;

/// 读取对象参数
#[derive(Args, Debug)]
pub struct ReadCommand {
    /// 对象索引（m 后的数字）
    pub index: u16,

    /// 对象子索引（s 后的数字）
    pub subindex: u16,
}

impl ReadCommand {
    pub fn object(&self) -> ObjectRef {
        ObjectRef::new(self.index, self.subindex)
    }

    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        let session = connection.connect()?;
        let obj = self.object();

        let value = session
            .read_object(obj)
            .with_context(|| format!("Failed to read {obj}"))?;
        println!("{obj} = {value}");
        Ok(())
    }
}

/// 写入对象参数
#[derive(Args, Debug)]
pub struct WriteCommand {
    /// 对象索引
    pub index: u16,

    /// 对象子索引
    pub subindex: u16,

    /// 写入值
    #[arg(allow_hyphen_values = true)]
    pub value: i32,

    /// 写入后读回确认
    #[arg(long)]
    pub verify: bool,
}

impl WriteCommand {
    pub fn object(&self) -> ObjectRef {
        ObjectRef::new(self.index, self.subindex)
    }

    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        let session = connection.connect()?;
        let obj = self.object();

        session
            .write_object(obj, self.value)
            .with_context(|| format!("Failed to write {obj}"))?;
        println!("✅ {obj} <- {}", self.value);

        if self.verify {
            let read_back = session
                .read_object(obj)
                .with_context(|| format!("Failed to read back {obj}"))?;
            if read_back != self.value {
                anyhow::bail!("{obj} reads back {read_back}, expected {}", self.value);
            }
            println!("✅ Verified {obj} = {read_back}");
        }
        Ok(())
    }
}
