//! Toolbar module
//!
//! 时间轴上方的工具栏：当前时间、工具选择、多选开关和 AB 循环开关。
//! 工具栏不直接修改状态，只通过回调发出命令。

use crate::editor::TimelineCommand;
use crate::input::ToolMode;
use crate::utils::format_time;
use egui::*;

pub struct Toolbar {
    tool: ToolMode,
    multi_select: bool,
    current_time: f64,
    repeat_set: bool,
    repeat_enabled: bool,
}

impl Toolbar {
    pub fn new(tool: ToolMode, multi_select: bool) -> Self {
        Self {
            tool,
            multi_select,
            current_time: 0.0,
            repeat_set: false,
            repeat_enabled: false,
        }
    }

    pub fn set_current_time(&mut self, time: f64) {
        self.current_time = time;
    }

    pub fn set_repeat(&mut self, set: bool, enabled: bool) {
        self.repeat_set = set;
        self.repeat_enabled = enabled;
    }

    pub fn ui(&mut self, ui: &mut Ui, command_callback: &mut dyn FnMut(TimelineCommand)) {
        ui.horizontal(|ui| {
            ui.label(format!("Time: {}", format_time(self.current_time)));
            ui.separator();

            for tool in ToolMode::ALL {
                if ui.selectable_label(self.tool == tool, tool.label()).clicked() && self.tool != tool {
                    command_callback(TimelineCommand::SetTool(tool));
                }
            }

            ui.separator();

            let mut multi = self.multi_select;
            if ui.checkbox(&mut multi, "Multi-select").changed() {
                command_callback(TimelineCommand::SetMultiSelect(multi));
            }

            ui.separator();

            let mut repeat = self.repeat_enabled;
            let toggle = ui.add_enabled(self.repeat_set, Checkbox::new(&mut repeat, "A/B repeat"));
            if toggle.changed() {
                command_callback(TimelineCommand::SetAbRepeatOn(repeat));
            }
            if ui
                .add_enabled(self.repeat_set, Button::new("Clear A/B"))
                .clicked()
            {
                command_callback(TimelineCommand::ClearRepeat);
            }
        });
    }
}
