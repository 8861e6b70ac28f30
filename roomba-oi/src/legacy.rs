//! Legacy call surface
//!
//! Fixed-speed moves and a polling `refresh_data` that report plain
//! [`ResultCode`]s or booleans. Straight moves run at
//! `robot.default_velocity` and in-place turns at `robot.turn_velocity`.
//! Everything delegates to [`Roomba`], so statistics and `last_error` are
//! shared with the typed API.

use crate::error::{Result, ResultCode};
use crate::roomba::Roomba;
use crate::telemetry::Telemetry;
use crate::transport::Transport;

pub struct LegacyRoomba<T: Transport> {
    inner: Roomba<T>,
}

fn code(result: Result<()>) -> ResultCode {
    ResultCode::from(&result)
}

impl<T: Transport> LegacyRoomba<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Roomba::new(transport),
        }
    }

    /// Wrap an already configured controller
    pub fn from_roomba(inner: Roomba<T>) -> Self {
        Self { inner }
    }

    /// Open at `baud_rate` and run the START / SAFE wake-up sequence
    pub fn roomba_setup(&mut self, baud_rate: u32) -> ResultCode {
        code(self.inner.initialize(baud_rate))
    }

    pub fn go_forward(&mut self) -> ResultCode {
        let v = self.inner.robot_config().default_velocity;
        code(self.inner.move_forward(v))
    }

    pub fn go_backward(&mut self) -> ResultCode {
        let v = self.inner.robot_config().default_velocity;
        code(self.inner.move_backward(v))
    }

    pub fn turn_left(&mut self) -> ResultCode {
        let v = self.inner.robot_config().turn_velocity;
        code(self.inner.turn_left(v))
    }

    pub fn turn_right(&mut self) -> ResultCode {
        let v = self.inner.robot_config().turn_velocity;
        code(self.inner.turn_right(v))
    }

    pub fn halt(&mut self) -> ResultCode {
        code(self.inner.stop())
    }

    pub fn query_stream(&mut self, ids: &[u8]) -> ResultCode {
        code(self.inner.start_stream(ids))
    }

    pub fn reset_stream(&mut self) -> ResultCode {
        code(self.inner.reset_stream())
    }

    /// Poll the stream; `infos` is only overwritten when a frame decoded
    pub fn refresh_data(&mut self, infos: &mut Telemetry) -> bool {
        self.inner.update_telemetry(infos).is_success()
    }

    pub fn last_error(&self) -> ResultCode {
        self.inner.last_error()
    }

    pub fn roomba(&self) -> &Roomba<T> {
        &self.inner
    }

    pub fn roomba_mut(&mut self) -> &mut Roomba<T> {
        &mut self.inner
    }

    pub fn into_roomba(self) -> Roomba<T> {
        self.inner
    }
}
