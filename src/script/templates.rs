use crate::plan::{ArchiveStorage, TargetOptions};

pub const PWSH_SHEBANG: &str = "#!/usr/bin/env pwsh";

pub fn version_banner() -> String {
    format!(
        "# =========== Created with {} version {} ===========",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

pub const EXEC_BLOCK: &str = r#"
function Exec {
    param (
        [scriptblock]$ScriptBlock
    )
    & @ScriptBlock
    if ($lastexitcode -ne 0) {
        exit $lastexitcode
    }
}"#;

pub const EXEC_AND_GET_MIGRATION_ID_BLOCK: &str = r#"
function ExecAndGetMigrationID {
    param (
        [scriptblock]$ScriptBlock
    )
    $MigrationID = & @ScriptBlock | ForEach-Object {
        Write-Host $_
        $_
    } | Select-String -Pattern "\(ID: (.+)\)" | ForEach-Object { $_.matches.groups[1] }
    return $MigrationID
}"#;

/// Runs every block even when an earlier one fails, counting failures.
pub const EXEC_BATCH_BLOCK: &str = r#"
function ExecBatch {
    param (
        [scriptblock[]]$ScriptBlocks
    )
    $Global:LastBatchFailures = 0
    foreach ($ScriptBlock in $ScriptBlocks)
    {
        & @ScriptBlock
        if ($lastexitcode -ne 0) {
            $Global:LastBatchFailures++
        }
    }
}"#;

const VALIDATE_ADO_PAT: &str = r#"
if (-not $env:ADO_PAT) {
    Write-Error "ADO_PAT environment variable must be set to an Azure DevOps personal access token with the scopes needed for migration."
    exit 1
} else {
    Write-Host "ADO_PAT environment variable is set and will be used to authenticate to Azure DevOps."
}"#;

const VALIDATE_GH_PAT: &str = r#"
if (-not $env:GH_PAT) {
    Write-Error "GH_PAT environment variable must be set to a GitHub personal access token with the scopes needed for migration."
    exit 1
} else {
    Write-Host "GH_PAT environment variable is set and will be used to authenticate to GitHub."
}"#;

const VALIDATE_AZURE_STORAGE: &str = r#"
if (-not $env:AZURE_STORAGE_CONNECTION_STRING) {
    Write-Error "AZURE_STORAGE_CONNECTION_STRING environment variable must be set to upload migration archives to Azure Blob Storage."
    exit 1
}
if ($env:AWS_ACCESS_KEY_ID -or $env:AWS_SECRET_ACCESS_KEY) {
    Write-Error "AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY are set but the script uploads to Azure Blob Storage. Set exactly one storage provider for the migration archives."
    exit 1
}
Write-Host "AZURE_STORAGE_CONNECTION_STRING environment variable is set and will be used to upload migration archives to Azure Blob Storage.""#;

const VALIDATE_AWS_STORAGE: &str = r#"
if (-not $env:AWS_ACCESS_KEY_ID -or -not $env:AWS_SECRET_ACCESS_KEY) {
    Write-Error "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY environment variables must be set to upload migration archives to AWS S3."
    exit 1
}
if ($env:AZURE_STORAGE_CONNECTION_STRING) {
    Write-Error "AZURE_STORAGE_CONNECTION_STRING is set but the script uploads to AWS S3. Set exactly one storage provider for the migration archives."
    exit 1
}
Write-Host "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY environment variables are set and will be used to upload migration archives to AWS S3.""#;

/// Credential checks that run before any step.
///
/// Archive transfers check the credentials of the storage the options picked and
/// reject the other provider's credentials.
pub fn preconditions(target: &TargetOptions) -> Vec<&'static str> {
    let mut blocks = vec![VALIDATE_ADO_PAT, VALIDATE_GH_PAT];
    match target.archive.as_ref().map(|archive| archive.storage()) {
        Some(ArchiveStorage::AzureBlob) => blocks.push(VALIDATE_AZURE_STORAGE),
        Some(ArchiveStorage::AwsS3) => blocks.push(VALIDATE_AWS_STORAGE),
        Some(ArchiveStorage::GitHub) | None => {}
    }
    blocks
}

pub const SUMMARY_BLOCK: &str = r#"
Write-Host =============== Summary ===============
Write-Host Total number of successful migrations: $Succeeded
Write-Host Total number of failed migrations: $Failed

if ($Failed -ne 0) {
    exit 1
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ArchiveTransfer;

    #[test]
    fn test_tokens_always_validated() {
        let blocks = preconditions(&TargetOptions::new("gh"));
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("$env:ADO_PAT"));
        assert!(blocks[1].contains("$env:GH_PAT"));
    }

    fn archive_target(archive: ArchiveTransfer) -> TargetOptions {
        let mut target = TargetOptions::new("gh");
        target.archive = Some(ArchiveTransfer {
            ghes_api_url: "https://ghes/api/v3".into(),
            ..archive
        });
        target
    }

    #[test]
    fn test_azure_storage_checked_by_default() {
        let blocks = preconditions(&archive_target(ArchiveTransfer::default()));
        assert_eq!(blocks.len(), 3);
        assert!(blocks[2].contains("if (-not $env:AZURE_STORAGE_CONNECTION_STRING) {"));
        assert!(blocks[2].contains("if ($env:AWS_ACCESS_KEY_ID -or $env:AWS_SECRET_ACCESS_KEY) {"));
    }

    #[test]
    fn test_aws_bucket_selects_aws_credentials() {
        let aws = preconditions(&archive_target(ArchiveTransfer {
            aws_bucket_name: Some("bucket".into()),
            ..Default::default()
        }));
        let azure = preconditions(&archive_target(ArchiveTransfer::default()));

        assert_eq!(aws.len(), 3);
        assert_ne!(aws[2], azure[2]);
        assert!(aws[2].contains("if (-not $env:AWS_ACCESS_KEY_ID -or -not $env:AWS_SECRET_ACCESS_KEY) {"));
        assert!(aws[2].contains("if ($env:AZURE_STORAGE_CONNECTION_STRING) {"));
    }

    #[test]
    fn test_github_storage_needs_no_storage_credentials() {
        let blocks = preconditions(&archive_target(ArchiveTransfer {
            use_github_storage: true,
            ..Default::default()
        }));
        assert_eq!(blocks.len(), 2);
    }
}
