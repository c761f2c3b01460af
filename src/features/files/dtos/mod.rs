mod file_dto;

pub use file_dto::{
    DeleteFileResponseDto, DownloadResponseDto, FileResponseDto, MetadataResponseDto,
    UploadFileDto,
};
