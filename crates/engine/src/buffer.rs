use candlecast_core::forecast::error::ForecastError;

/// # Summary
/// 固定容量的滚动窗口，自回归预测时承载模型输入。
///
/// # Invariants
/// - 内存空间在初始化时一次性分配，后续不再扩容。
/// - 构造后始终满载，保持最近 `capacity` 个值，每次推进淘汰最旧的一个。
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    // 内部存储容器
    data: Vec<f64>,
    // 最大容量
    capacity: usize,
    // 满载后下一次覆盖的位置，即最旧元素的索引
    cursor: usize,
}

impl RollingWindow {
    /// # Summary
    /// 以序列末尾的 `capacity` 个值构造满载窗口。
    ///
    /// # Logic
    /// 1. 校验容量非零。
    /// 2. 校验输入长度不少于容量。
    /// 3. 取最后 `capacity` 个值，按时间顺序放入。
    ///
    /// # Arguments
    /// * `values`: 按时间升序的数据。
    /// * `capacity`: 窗口长度 W。
    ///
    /// # Returns
    /// 容量为 0 返回 `InvalidArgument`，数据不足返回 `InsufficientData`。
    pub fn from_tail(values: &[f64], capacity: usize) -> Result<Self, ForecastError> {
        if capacity == 0 {
            return Err(ForecastError::InvalidArgument(
                "window size must be positive".into(),
            ));
        }
        if values.len() < capacity {
            return Err(ForecastError::InsufficientData {
                needed: capacity,
                got: values.len(),
            });
        }

        let mut data = Vec::with_capacity(capacity);
        data.extend_from_slice(&values[values.len() - capacity..]);
        Ok(Self {
            data,
            capacity,
            cursor: 0,
        })
    }

    /// # Summary
    /// 消费当前窗口，返回推入 `value` 之后的新窗口。
    ///
    /// # Logic
    /// 覆盖 cursor 处最旧的值，并递增（取模）cursor。
    pub fn advanced(mut self, value: f64) -> Self {
        self.data[self.cursor] = value;
        self.cursor = (self.cursor + 1) % self.capacity;
        self
    }

    /// # Summary
    /// 获取按插入顺序（最旧在前）排列的窗口内容。
    ///
    /// # Logic
    /// 通过 cursor 切割并重组两段数据。
    pub fn to_vec(&self) -> Vec<f64> {
        let mut result = Vec::with_capacity(self.data.len());
        result.extend_from_slice(&self.data[self.cursor..]);
        result.extend_from_slice(&self.data[..self.cursor]);
        result
    }
}
